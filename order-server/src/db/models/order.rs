//! Order model
//!
//! An order is a checkout-time snapshot: line items are priced once at
//! assembly and never recalculated. Only status and payment fields mutate
//! afterwards.

use serde::{Deserialize, Serialize};
use shared::order::{DeliveryInfo, OrderStatus, PaymentMethod, PaymentStatus, PricedLineItem};

/// Persisted order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    /// External reference forwarded to payment providers
    pub custom_id: String,
    pub location_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub delivery: DeliveryInfo,
    pub items: Vec<PricedLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<String>,
    pub discount: f64,
    /// Subtotal after discount, before tax
    pub discounted_subtotal: f64,
    pub tax: f64,
    pub total_price: f64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    /// Requested fulfillment date, `YYYY-MM-DD`
    pub order_date: String,
    /// Requested fulfillment time, `HH:MM`
    pub order_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Rendered invoice, present once payment confirms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_key: Option<String>,
    /// Hosted checkout URL (card), cleared once payment resolves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_url: Option<String>,
    /// Approval URL (PayPal), cleared once payment resolves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OrderRecord {
    /// The redirect handle stored for this order's payment method, if any.
    pub fn payment_url(&self) -> Option<&str> {
        match self.payment_method {
            PaymentMethod::Card => self.checkout_session_url.as_deref(),
            PaymentMethod::PayPal => self.approval_url.as_deref(),
            PaymentMethod::Wallet => None,
        }
    }
}
