//! Coupon model

use serde::{Deserialize, Serialize};

/// Percentage discount coupon
///
/// Names are stored upper-cased and unique. `used_by` is a set: each user
/// may consume a coupon at most once until a cancellation releases it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub coupon_id: String,
    pub name: String,
    /// Discount percentage, 1-100
    pub amount: f64,
    /// Expiry timestamp (ms since epoch)
    pub expire_at: i64,
    #[serde(default)]
    pub used_by: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub created_at: i64,
}

impl Coupon {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expire_at
    }

    pub fn is_used_by(&self, user_id: &str) -> bool {
        self.used_by.iter().any(|u| u == user_id)
    }
}
