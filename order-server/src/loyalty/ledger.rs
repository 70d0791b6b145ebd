//! Loyalty Ledger
//!
//! Wallet balance and points as an append-only transaction log plus running
//! totals. Every mutation appends a transaction and recomputes the totals;
//! the stored totals must always be re-derivable by summing the log.
//!
//! Wallet mutations for one user are read-modify-write (redeem and spend
//! both check-then-decrement), so they serialize on a per-user keyed lock.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use thiserror::Error;

use crate::db::models::{TransactionKind, Wallet, WalletTransaction};
use crate::db::repository::{RepoError, WalletRepository};
use crate::pricing::money::{to_decimal, to_f64};
use crate::utils::KeyedMutex;

/// Points earned per currency unit spent
pub const POINTS_PER_DOLLAR: i64 = 10;
/// Points required per currency unit redeemed
pub const POINTS_TO_DOLLAR_CONVERSION: i64 = 100;

/// Ledger failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient wallet balance: have {balance:.2}, need {required:.2}")]
    InsufficientBalance { balance: f64, required: f64 },

    #[error("Not enough points to redeem: have {points}, requested {requested}")]
    InsufficientPoints { points: i64, requested: i64 },

    #[error("Points can only be redeemed in multiples of {0}")]
    InvalidRedemptionGranularity(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<LedgerError> for crate::utils::AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance { .. } | LedgerError::InsufficientPoints { .. } => {
                crate::utils::AppError::InsufficientFunds(err.to_string())
            }
            LedgerError::InvalidRedemptionGranularity(_) | LedgerError::InvalidAmount(_) => {
                crate::utils::AppError::Validation(err.to_string())
            }
            LedgerError::Repo(e) => e.into(),
        }
    }
}

/// The wallet + points ledger service
#[derive(Clone)]
pub struct LoyaltyLedger {
    wallets: WalletRepository,
    locks: Arc<KeyedMutex>,
}

impl LoyaltyLedger {
    pub fn new(wallets: WalletRepository, locks: Arc<KeyedMutex>) -> Self {
        Self { wallets, locks }
    }

    /// Current wallet view. A user who never earned anything gets a fresh
    /// zero wallet (not persisted until first mutation).
    pub async fn wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        Ok(self
            .wallets
            .find_by_user(user_id)
            .await?
            .unwrap_or_else(|| Wallet::new(user_id)))
    }

    /// Award points for a paid order: `floor(amount_spent * rate)` points.
    ///
    /// Creates the wallet on first use.
    pub async fn reward(
        &self,
        user_id: &str,
        order_id: &str,
        amount_spent: f64,
    ) -> Result<Wallet, LedgerError> {
        if amount_spent < 0.0 || !amount_spent.is_finite() {
            return Err(LedgerError::InvalidAmount(format!(
                "reward amount must be a non-negative number, got {amount_spent}"
            )));
        }

        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;

        let mut wallet = self.load_or_create(user_id).await?;

        let earned = (to_decimal(amount_spent) * Decimal::from(POINTS_PER_DOLLAR))
            .floor()
            .to_i64()
            .unwrap_or(0);

        wallet.points += earned;
        wallet.transactions.push(WalletTransaction {
            kind: TransactionKind::Reward,
            points: earned,
            amount: 0.0,
            order_id: Some(order_id.to_string()),
            created_at: shared::util::now_millis(),
        });

        let saved = self.wallets.save(&wallet).await?;
        tracing::info!(user = %user_id, order = %order_id, points = earned, "Loyalty points rewarded");
        Ok(saved)
    }

    /// Convert points into spendable balance.
    ///
    /// Rejected when the user holds fewer points than requested or when the
    /// request is not a multiple of the conversion unit.
    pub async fn redeem(&self, user_id: &str, points: i64) -> Result<Wallet, LedgerError> {
        if points <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "redeemed points must be positive, got {points}"
            )));
        }

        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;

        let mut wallet = self.load_or_create(user_id).await?;

        if points > wallet.points {
            return Err(LedgerError::InsufficientPoints {
                points: wallet.points,
                requested: points,
            });
        }
        if points % POINTS_TO_DOLLAR_CONVERSION != 0 {
            return Err(LedgerError::InvalidRedemptionGranularity(
                POINTS_TO_DOLLAR_CONVERSION,
            ));
        }

        let credited = to_f64(Decimal::from(points) / Decimal::from(POINTS_TO_DOLLAR_CONVERSION));

        wallet.points -= points;
        wallet.balance = to_f64(to_decimal(wallet.balance) + to_decimal(credited));
        wallet.transactions.push(WalletTransaction {
            kind: TransactionKind::Redeem,
            points: -points,
            amount: credited,
            order_id: None,
            created_at: shared::util::now_millis(),
        });

        let saved = self.wallets.save(&wallet).await?;
        tracing::info!(user = %user_id, points, credited, "Points redeemed");
        Ok(saved)
    }

    /// Debit the wallet for a wallet-paid order.
    ///
    /// Full amount or rejection; never a partial debit.
    pub async fn spend(
        &self,
        user_id: &str,
        order_id: &str,
        amount: f64,
    ) -> Result<Wallet, LedgerError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(LedgerError::InvalidAmount(format!(
                "spend amount must be a positive number, got {amount}"
            )));
        }

        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;

        let mut wallet = self.load_or_create(user_id).await?;

        if to_decimal(amount) > to_decimal(wallet.balance) {
            return Err(LedgerError::InsufficientBalance {
                balance: wallet.balance,
                required: amount,
            });
        }

        wallet.balance = to_f64(to_decimal(wallet.balance) - to_decimal(amount));
        wallet.transactions.push(WalletTransaction {
            kind: TransactionKind::Spend,
            points: 0,
            amount,
            order_id: Some(order_id.to_string()),
            created_at: shared::util::now_millis(),
        });

        let saved = self.wallets.save(&wallet).await?;
        tracing::info!(user = %user_id, order = %order_id, amount, "Wallet debited");
        Ok(saved)
    }

    async fn load_or_create(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        match self.wallets.find_by_user(user_id).await? {
            Some(wallet) => Ok(wallet),
            None => Ok(self.wallets.create(&Wallet::new(user_id)).await?),
        }
    }
}

/// Recompute balance and points from the transaction log and compare with
/// the stored totals. Reconciliation jobs call this; it must always hold.
pub fn verify_ledger(wallet: &Wallet) -> bool {
    let mut balance = Decimal::ZERO;
    let mut points: i64 = 0;

    for tx in &wallet.transactions {
        points += tx.points;
        match tx.kind {
            TransactionKind::Reward => {}
            TransactionKind::Redeem => balance += to_decimal(tx.amount),
            TransactionKind::Spend => balance -= to_decimal(tx.amount),
        }
    }

    to_f64(balance) == wallet.balance && points == wallet.points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn make_ledger() -> LoyaltyLedger {
        let db = db::connect_in_memory().await.unwrap();
        LoyaltyLedger::new(WalletRepository::new(db), Arc::new(KeyedMutex::new()))
    }

    #[tokio::test]
    async fn reward_creates_wallet_lazily() {
        let ledger = make_ledger().await;
        let wallet = ledger.reward("user-1", "ord-1", 48.15).await.unwrap();
        // floor(48.15 * 10) = 481
        assert_eq!(wallet.points, 481);
        assert_eq!(wallet.balance, 0.0);
        assert_eq!(wallet.transactions.len(), 1);
        assert!(verify_ledger(&wallet));
    }

    #[tokio::test]
    async fn redeem_requires_multiple_of_conversion_unit() {
        let ledger = make_ledger().await;
        ledger.reward("user-1", "ord-1", 50.0).await.unwrap();

        let err = ledger.redeem("user-1", 150).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRedemptionGranularity(100)));

        let wallet = ledger.redeem("user-1", 300).await.unwrap();
        assert_eq!(wallet.points, 200);
        assert_eq!(wallet.balance, 3.0);
        assert!(verify_ledger(&wallet));
    }

    #[tokio::test]
    async fn redeem_rejects_more_points_than_held() {
        let ledger = make_ledger().await;
        ledger.reward("user-1", "ord-1", 10.0).await.unwrap(); // 100 points

        let err = ledger.redeem("user-1", 200).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientPoints {
                points: 100,
                requested: 200
            }
        ));
    }

    #[tokio::test]
    async fn spend_rejects_overdraft_and_leaves_balance_unchanged() {
        let ledger = make_ledger().await;
        ledger.reward("user-1", "ord-1", 50.0).await.unwrap(); // 500 points
        ledger.redeem("user-1", 500).await.unwrap(); // balance 5.0

        let err = ledger.spend("user-1", "ord-2", 10.0).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        let wallet = ledger.wallet("user-1").await.unwrap();
        assert_eq!(wallet.balance, 5.0);
        assert!(verify_ledger(&wallet));
    }

    #[tokio::test]
    async fn spend_debits_exact_amount() {
        let ledger = make_ledger().await;
        ledger.reward("user-1", "ord-1", 100.0).await.unwrap(); // 1000 points
        ledger.redeem("user-1", 1000).await.unwrap(); // balance 10.0

        let wallet = ledger.spend("user-1", "ord-2", 7.35).await.unwrap();
        assert_eq!(wallet.balance, 2.65);
        assert_eq!(wallet.transactions.len(), 3);
        assert!(verify_ledger(&wallet));
    }

    #[tokio::test]
    async fn balance_equals_sum_of_signed_effects_after_mixed_history() {
        let ledger = make_ledger().await;
        ledger.reward("user-1", "ord-1", 25.0).await.unwrap();
        ledger.reward("user-1", "ord-2", 75.0).await.unwrap();
        ledger.redeem("user-1", 800).await.unwrap();
        ledger.spend("user-1", "ord-3", 3.5).await.unwrap();

        let wallet = ledger.wallet("user-1").await.unwrap();
        assert_eq!(wallet.points, 200);
        assert_eq!(wallet.balance, 4.5);
        assert!(verify_ledger(&wallet));
    }

    #[tokio::test]
    async fn concurrent_spends_never_overdraw() {
        let ledger = make_ledger().await;
        ledger.reward("user-1", "ord-1", 100.0).await.unwrap();
        ledger.redeem("user-1", 1000).await.unwrap(); // balance 10.0

        let mut handles = Vec::new();
        for i in 0..4 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.spend("user-1", &format!("ord-{i}"), 4.0).await
            }));
        }

        let mut succeeded = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        // 10.0 covers exactly two 4.0 spends
        assert_eq!(succeeded, 2);
        let wallet = ledger.wallet("user-1").await.unwrap();
        assert_eq!(wallet.balance, 2.0);
        assert!(verify_ledger(&wallet));
    }

    #[test]
    fn verify_detects_tampered_totals() {
        let mut wallet = Wallet::new("user-1");
        wallet.transactions.push(WalletTransaction {
            kind: TransactionKind::Reward,
            points: 100,
            amount: 0.0,
            order_id: None,
            created_at: 0,
        });
        wallet.points = 100;
        assert!(verify_ledger(&wallet));

        wallet.points = 150;
        assert!(!verify_ledger(&wallet));
    }
}
