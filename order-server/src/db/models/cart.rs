//! Cart model

use serde::{Deserialize, Serialize};
use shared::order::{AddonKind, MealSelection};

/// A standalone addon purchase (outside any meal)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartExtra {
    pub kind: AddonKind,
    pub option_id: String,
    pub quantity: i32,
}

/// A user's pending selections. Exactly one active cart per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: String,
    pub user_id: String,
    #[serde(default)]
    pub meals: Vec<MealSelection>,
    #[serde(default)]
    pub extras: Vec<CartExtra>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.meals.is_empty() && self.extras.is_empty()
    }
}
