//! Addon option model (sauces, drinks, sides)

use serde::{Deserialize, Serialize};
use shared::order::AddonKind;

/// A purchasable addon option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonOption {
    pub option_id: String,
    pub kind: AddonKind,
    pub name: String,
    pub price: f64,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

impl AddonOption {
    pub fn is_orderable(&self) -> bool {
        self.is_available && !self.is_deleted
    }
}
