//! Wallet Repository
//!
//! The whole wallet document (balances + transaction log) is replaced on
//! save. The loyalty ledger serializes per-user mutations with a keyed
//! lock, so the read-modify-write here never races with itself.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::Wallet;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct WalletRepository {
    base: BaseRepository,
}

impl WalletRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_user(&self, user_id: &str) -> RepoResult<Option<Wallet>> {
        let wallet: Option<Wallet> = self
            .base
            .db()
            .query("SELECT * FROM wallet WHERE user_id = $user_id LIMIT 1")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(wallet)
    }

    pub async fn create(&self, wallet: &Wallet) -> RepoResult<Wallet> {
        let created: Option<Wallet> = self
            .base
            .db()
            .query("CREATE wallet CONTENT $data RETURN AFTER")
            .bind(("data", wallet.clone()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        created.ok_or_else(|| RepoError::Database("wallet create returned nothing".into()))
    }

    /// Persist updated balances and the appended transaction.
    pub async fn save(&self, wallet: &Wallet) -> RepoResult<Wallet> {
        let updated: Option<Wallet> = self
            .base
            .db()
            .query(
                "UPDATE wallet SET \
                    balance = $balance, \
                    points = $points, \
                    transactions = $transactions, \
                    updated_at = $updated_at \
                 WHERE wallet_id = $wallet_id RETURN AFTER",
            )
            .bind(("wallet_id", wallet.wallet_id.clone()))
            .bind(("balance", wallet.balance))
            .bind(("points", wallet.points))
            .bind(("transactions", wallet.transactions.clone()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("wallet {}", wallet.wallet_id)))
    }
}
