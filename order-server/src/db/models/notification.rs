//! Notification outbox model
//!
//! Order workflows enqueue a typed record here; a worker delivers it
//! out-of-band. Delivery is best-effort and never fails the request that
//! enqueued it.

use serde::{Deserialize, Serialize};

/// What kind of delivery the record asks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Realtime order alert to the fulfilling location
    OrderPaid,
    /// Invoice email to the customer
    InvoiceEmail,
}

/// Delivery state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

/// One enqueued notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub record_id: String,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub order_id: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub status: OutboxStatus,
    #[serde(default)]
    pub attempts: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OutboxRecord {
    pub fn new(
        kind: NotificationKind,
        location_id: Option<String>,
        order_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let now = shared::util::now_millis();
        Self {
            record_id: shared::util::next_id("ntf"),
            kind,
            location_id,
            order_id: order_id.into(),
            payload,
            status: OutboxStatus::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
