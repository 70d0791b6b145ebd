//! Wallet model
//!
//! The transaction log is append-only; balance and points are running
//! totals that must always equal the sum of the log's signed effects.

use serde::{Deserialize, Serialize};

/// Ledger transaction kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Points earned from a paid order
    Reward,
    /// Balance spent on a wallet-paid order
    Spend,
    /// Points converted to spendable balance
    Redeem,
}

/// One ledger entry. Never mutated or deleted after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub kind: TransactionKind,
    /// Points delta (positive for reward, negative for redeem)
    #[serde(default)]
    pub points: i64,
    /// Currency magnitude (redeem credits it, spend debits it)
    #[serde(default)]
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub created_at: i64,
}

/// A user's wallet: spendable balance, accrued points, transaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: String,
    pub user_id: String,
    pub balance: f64,
    pub points: i64,
    #[serde(default)]
    pub transactions: Vec<WalletTransaction>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Wallet {
    /// Fresh wallet with zero balances (lazy init on first use).
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = shared::util::now_millis();
        Self {
            wallet_id: shared::util::next_id("wal"),
            user_id: user_id.into(),
            balance: 0.0,
            points: 0,
            transactions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
