//! Stripe hosted-checkout client
//!
//! Builds checkout sessions whose line items mirror the order's priced
//! snapshot: one line per meal at its computed line total (base price plus
//! only the charged addons), a separate tax line, and the coupon discount
//! forwarded as a one-off provider coupon.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use crate::db::models::OrderRecord;
use crate::payments::provider::{
    CheckoutSession, HostedCheckoutProvider, PaymentError, SessionStatus,
};
use crate::pricing::money::to_decimal;

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    /// Base URL the customer returns to after the hosted page
    return_base: String,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: &str, return_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            return_base: return_base.trim_end_matches('/').to_string(),
        }
    }

    fn to_cents(value: f64) -> i64 {
        (to_decimal(value) * Decimal::from(100))
            .round()
            .to_i64()
            .unwrap_or(0)
    }

    /// One-off amount-off coupon so the hosted page shows the discount.
    async fn create_discount_coupon(&self, order: &OrderRecord) -> Option<String> {
        if order.discount <= 0.0 {
            return None;
        }
        let params = vec![
            ("amount_off".to_string(), Self::to_cents(order.discount).to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("duration".to_string(), "once".to_string()),
            ("name".to_string(), "Order discount".to_string()),
        ];
        let result = self
            .http
            .post(format!("{}/v1/coupons", self.api_base))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v["id"].as_str().map(str::to_string)),
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Failed to create provider discount coupon");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create provider discount coupon");
                None
            }
        }
    }
}

#[async_trait]
impl HostedCheckoutProvider for StripeClient {
    async fn create_session(
        &self,
        order: &OrderRecord,
        customer_email: Option<&str>,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            (
                "success_url".into(),
                format!(
                    "{}/order/success/{}/{{CHECKOUT_SESSION_ID}}",
                    self.return_base, order.order_id
                ),
            ),
            (
                "cancel_url".into(),
                format!("{}/order/cancel/{}", self.return_base, order.order_id),
            ),
            ("metadata[orderId]".into(), order.order_id.clone()),
        ];
        if let Some(email) = customer_email {
            params.push(("customer_email".into(), email.to_string()));
        }

        // One line per meal: the unit amount is the line total (meal price x
        // quantity plus the charged addons), so quantity on the provider
        // side is always 1.
        let mut line = 0;
        for item in &order.items {
            let prefix = format!("line_items[{line}]");
            let name = if item.is_combo {
                format!("{} (Qty: {}) [Combo]", item.title, item.quantity)
            } else {
                format!("{} (Qty: {})", item.title, item.quantity)
            };
            params.push((format!("{prefix}[price_data][currency]"), "usd".into()));
            params.push((
                format!("{prefix}[price_data][product_data][name]"),
                name,
            ));
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                Self::to_cents(item.line_total).to_string(),
            ));
            params.push((format!("{prefix}[quantity]"), "1".into()));
            line += 1;
        }

        if order.tax > 0.0 {
            let prefix = format!("line_items[{line}]");
            params.push((format!("{prefix}[price_data][currency]"), "usd".into()));
            params.push((
                format!("{prefix}[price_data][product_data][name]"),
                "Tax".into(),
            ));
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                Self::to_cents(order.tax).to_string(),
            ));
            params.push((format!("{prefix}[quantity]"), "1".into()));
        }

        if let Some(coupon_id) = self.create_discount_coupon(order).await {
            params.push(("discounts[0][coupon]".into(), coupon_id));
        }

        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("checkout session request: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!(
                "checkout session creation failed ({status}): {body}"
            )));
        }

        let session: Value = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("checkout session response: {e}")))?;

        let session_id = session["id"]
            .as_str()
            .ok_or_else(|| PaymentError::Provider("session response missing id".into()))?;
        let url = session["url"]
            .as_str()
            .ok_or_else(|| PaymentError::Provider("session response missing url".into()))?;

        Ok(CheckoutSession {
            session_id: session_id.to_string(),
            url: url.to_string(),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        let resp = self
            .http
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.api_base
            ))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("session retrieve request: {e}")))?;

        if !resp.status().is_success() {
            return Err(PaymentError::Provider(format!(
                "session retrieve failed ({})",
                resp.status()
            )));
        }

        let session: Value = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("session retrieve response: {e}")))?;

        Ok(SessionStatus {
            session_id: session_id.to_string(),
            paid: session["payment_status"].as_str() == Some("paid"),
            order_id: session["metadata"]["orderId"].as_str().map(str::to_string),
        })
    }
}
