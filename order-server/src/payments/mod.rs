//! Payments
//!
//! Provider-specific initiation and confirmation, normalized into order
//! lifecycle events.

pub mod gateway;
pub mod paypal;
pub mod provider;
pub mod stripe;
pub mod webhook;

pub use gateway::{PaymentGateway, PaymentInitiation};
pub use paypal::PayPalClient;
pub use provider::{
    CaptureResult, CheckoutSession, HostedCheckoutProvider, PaymentError, ProviderOrder,
    RedirectCheckoutProvider, SessionStatus, WebhookHeaders,
};
pub use stripe::StripeClient;
pub use webhook::{CardEvent, parse_card_event, verify_card_signature};
