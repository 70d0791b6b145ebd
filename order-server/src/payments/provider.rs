//! Payment provider seams
//!
//! The gateway speaks to providers only through these traits, so tests can
//! substitute fakes and a deployment can swap providers without touching
//! checkout logic.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::OrderRecord;
use crate::loyalty::LedgerError;
use crate::orders::OrderError;
use crate::utils::AppError;

/// Payment adapter failures
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook payload missing order reference")]
    MissingOrderReference,

    #[error("Payment not completed at provider")]
    NotCompleted,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Provider(msg) => AppError::External(msg),
            // A bad signature must never mutate state; reject with 4xx.
            PaymentError::InvalidSignature => {
                AppError::Validation("Invalid webhook signature".into())
            }
            PaymentError::MissingOrderReference => {
                AppError::Validation("Webhook payload missing order reference".into())
            }
            PaymentError::NotCompleted => {
                AppError::Validation("Payment not completed at provider".into())
            }
            PaymentError::Ledger(e) => OrderError::Ledger(e).into(),
            PaymentError::Order(e) => e.into(),
        }
    }
}

/// A created hosted-checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// State of a hosted-checkout session at the provider
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub session_id: String,
    pub paid: bool,
    /// Order id carried in the session's opaque metadata
    pub order_id: Option<String>,
}

/// A created provider-side order awaiting approval
#[derive(Debug, Clone)]
pub struct ProviderOrder {
    pub provider_order_id: String,
    pub approval_url: String,
}

/// Result of capturing an approved provider order
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub completed: bool,
}

/// Card payments via a hosted checkout page
#[async_trait]
pub trait HostedCheckoutProvider: Send + Sync {
    /// Create a checkout session mirroring the order's priced line items.
    async fn create_session(
        &self,
        order: &OrderRecord,
        customer_email: Option<&str>,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Retrieve a session to verify payment on the success redirect.
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError>;
}

/// Transmission headers accompanying a PayPal-style webhook
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub transmission_sig: String,
    pub cert_url: String,
    pub auth_algo: String,
}

/// External-redirect payments (approve at provider, capture on return)
#[async_trait]
pub trait RedirectCheckoutProvider: Send + Sync {
    /// Create a provider order referencing this order's external id.
    async fn create_order(&self, order: &OrderRecord) -> Result<ProviderOrder, PaymentError>;

    /// Capture an approved provider order.
    async fn capture(&self, token: &str) -> Result<CaptureResult, PaymentError>;

    /// Verify a webhook delivery against the provider.
    async fn verify_webhook(
        &self,
        headers: &WebhookHeaders,
        event: &serde_json::Value,
    ) -> Result<bool, PaymentError>;
}
