//! Meal catalog model

use serde::{Deserialize, Serialize};

/// Catalog meal record
///
/// `final_price` is the à la carte price, `final_combo_price` the bundled
/// price when purchased as a combo. `wish_users` collects customers who
/// tried to order the meal while it was unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub meal_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub final_price: f64,
    pub final_combo_price: f64,
    /// Whether the meal can be purchased as a combo at all
    #[serde(default)]
    pub is_combo: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub wish_users: Vec<String>,
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

impl Meal {
    /// A meal can be ordered only while listed and in stock.
    pub fn is_orderable(&self) -> bool {
        self.is_available && !self.is_deleted
    }
}
