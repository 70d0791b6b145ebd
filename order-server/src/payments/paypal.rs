//! PayPal redirect-checkout client
//!
//! Creates a provider order referencing our external order id with an
//! item-total/tax-total breakdown, hands back the approval URL, and
//! captures on the return callback. Webhook deliveries are verified
//! against PayPal's verification endpoint before being trusted.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::db::models::OrderRecord;
use crate::payments::provider::{
    CaptureResult, PaymentError, ProviderOrder, RedirectCheckoutProvider, WebhookHeaders,
};

#[derive(Clone)]
pub struct PayPalClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    webhook_id: String,
    return_base: String,
}

impl PayPalClient {
    pub fn new(
        api_base: &str,
        client_id: &str,
        client_secret: &str,
        webhook_id: &str,
        return_base: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            webhook_id: webhook_id.to_string(),
            return_base: return_base.trim_end_matches('/').to_string(),
        }
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("oauth request: {e}")))?;

        if !resp.status().is_success() {
            return Err(PaymentError::Provider(format!(
                "oauth failed ({})",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("oauth response: {e}")))?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PaymentError::Provider("oauth response missing access_token".into()))
    }
}

#[async_trait]
impl RedirectCheckoutProvider for PayPalClient {
    async fn create_order(&self, order: &OrderRecord) -> Result<ProviderOrder, PaymentError> {
        let token = self.access_token().await?;

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": order.custom_id,
                "custom_id": order.order_id,
                "amount": {
                    "currency_code": "USD",
                    "value": format!("{:.2}", order.total_price),
                    "breakdown": {
                        "item_total": {
                            "currency_code": "USD",
                            "value": format!("{:.2}", order.discounted_subtotal),
                        },
                        "tax_total": {
                            "currency_code": "USD",
                            "value": format!("{:.2}", order.tax),
                        },
                    },
                },
            }],
            "application_context": {
                "user_action": "PAY_NOW",
                "return_url": format!("{}/order/paypal/success/{}", self.return_base, order.order_id),
                "cancel_url": format!("{}/order/paypal/cancel/{}", self.return_base, order.order_id),
            },
        });

        let resp = self
            .http
            .post(format!("{}/v2/checkout/orders", self.api_base))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("order create request: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!(
                "provider order creation failed ({status}): {body}"
            )));
        }

        let created: Value = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("order create response: {e}")))?;

        let provider_order_id = created["id"]
            .as_str()
            .ok_or_else(|| PaymentError::Provider("order response missing id".into()))?;
        let approval_url = created["links"]
            .as_array()
            .and_then(|links| {
                links
                    .iter()
                    .find(|l| l["rel"].as_str() == Some("approve"))
                    .and_then(|l| l["href"].as_str())
            })
            .ok_or_else(|| PaymentError::Provider("approval link not found".into()))?;

        Ok(ProviderOrder {
            provider_order_id: provider_order_id.to_string(),
            approval_url: approval_url.to_string(),
        })
    }

    async fn capture(&self, order_token: &str) -> Result<CaptureResult, PaymentError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{order_token}/capture",
                self.api_base
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("capture request: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!(
                "capture failed ({status}): {body}"
            )));
        }

        let capture: Value = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("capture response: {e}")))?;

        Ok(CaptureResult {
            completed: capture["status"].as_str() == Some("COMPLETED"),
        })
    }

    async fn verify_webhook(
        &self,
        headers: &WebhookHeaders,
        event: &Value,
    ) -> Result<bool, PaymentError> {
        let token = self.access_token().await?;

        let body = json!({
            "transmission_id": headers.transmission_id,
            "transmission_time": headers.transmission_time,
            "transmission_sig": headers.transmission_sig,
            "cert_url": headers.cert_url,
            "auth_algo": headers.auth_algo,
            "webhook_id": self.webhook_id,
            "webhook_event": event,
        });

        let resp = self
            .http
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.api_base
            ))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("webhook verify request: {e}")))?;

        if !resp.status().is_success() {
            return Err(PaymentError::Provider(format!(
                "webhook verify failed ({})",
                resp.status()
            )));
        }

        let verification: Value = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("webhook verify response: {e}")))?;

        Ok(verification["verification_status"].as_str() == Some("SUCCESS"))
    }
}
