//! Storefront location model

use serde::{Deserialize, Serialize};

/// A storefront location
///
/// `tax_rate` is a percentage (0-100) applied to the discounted subtotal at
/// checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub location_id: String,
    pub title: String,
    pub address: String,
    pub phone: String,
    pub tax_rate: f64,
    pub storefront_url: String,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
}
