//! Loyalty
//!
//! Points accrual, redemption, and wallet spending.

pub mod ledger;

pub use ledger::{
    LedgerError, LoyaltyLedger, POINTS_PER_DOLLAR, POINTS_TO_DOLLAR_CONVERSION, verify_ledger,
};
