//! Payment gateway
//!
//! Uniform interface over the three payment modes. Wallet settles
//! synchronously through the loyalty ledger; card and PayPal hand back a
//! redirect handle and settle later through a callback or webhook, both of
//! which normalize into the same lifecycle events.

use std::sync::Arc;

use shared::order::PaymentMethod;

use crate::db::models::OrderRecord;
use crate::db::repository::OrderRepository;
use crate::loyalty::LoyaltyLedger;
use crate::orders::OrderLifecycle;
use crate::payments::provider::{
    HostedCheckoutProvider, PaymentError, RedirectCheckoutProvider,
};

/// Result of initiating payment for a fresh order
#[derive(Debug, Clone)]
pub enum PaymentInitiation {
    /// Settled synchronously (wallet)
    Settled,
    /// Awaiting the customer at the provider
    Redirect(String),
}

#[derive(Clone)]
pub struct PaymentGateway {
    card: Arc<dyn HostedCheckoutProvider>,
    paypal: Arc<dyn RedirectCheckoutProvider>,
    orders: OrderRepository,
    ledger: LoyaltyLedger,
    lifecycle: OrderLifecycle,
}

impl PaymentGateway {
    pub fn new(
        card: Arc<dyn HostedCheckoutProvider>,
        paypal: Arc<dyn RedirectCheckoutProvider>,
        orders: OrderRepository,
        ledger: LoyaltyLedger,
        lifecycle: OrderLifecycle,
    ) -> Self {
        Self {
            card,
            paypal,
            orders,
            ledger,
            lifecycle,
        }
    }

    /// Dispatch payment for a freshly assembled Pending order.
    ///
    /// Wallet: debit then confirm immediately; an insufficient balance
    /// leaves the order Pending and unpaid. Card/PayPal: create the
    /// provider session, store the redirect handle on the order, return it.
    pub async fn initiate(
        &self,
        order: &OrderRecord,
        customer_email: Option<&str>,
    ) -> Result<PaymentInitiation, PaymentError> {
        match order.payment_method {
            PaymentMethod::Wallet => {
                self.ledger
                    .spend(&order.user_id, &order.order_id, order.total_price)
                    .await?;
                self.lifecycle
                    .confirm_payment(&order.order_id, customer_email)
                    .await?;
                Ok(PaymentInitiation::Settled)
            }
            PaymentMethod::Card => {
                let session = self.card.create_session(order, customer_email).await?;
                self.orders
                    .set_payment_url(&order.order_id, PaymentMethod::Card, &session.url)
                    .await
                    .map_err(crate::orders::OrderError::from)?;
                Ok(PaymentInitiation::Redirect(session.url))
            }
            PaymentMethod::PayPal => {
                let provider_order = self.paypal.create_order(order).await?;
                self.orders
                    .set_payment_url(
                        &order.order_id,
                        PaymentMethod::PayPal,
                        &provider_order.approval_url,
                    )
                    .await
                    .map_err(crate::orders::OrderError::from)?;
                Ok(PaymentInitiation::Redirect(provider_order.approval_url))
            }
        }
    }

    /// Success redirect from the hosted card page: verify the session with
    /// the provider before confirming. Idempotent via the lifecycle.
    pub async fn confirm_card_redirect(
        &self,
        order_id: &str,
        session_id: &str,
        customer_email: Option<&str>,
    ) -> Result<OrderRecord, PaymentError> {
        let status = self.card.retrieve_session(session_id).await?;
        if !status.paid {
            return Err(PaymentError::NotCompleted);
        }
        Ok(self
            .lifecycle
            .confirm_payment(order_id, customer_email)
            .await?)
    }

    /// Return callback from the PayPal approval page: capture, then confirm.
    pub async fn confirm_paypal_capture(
        &self,
        order_id: &str,
        provider_token: &str,
        customer_email: Option<&str>,
    ) -> Result<OrderRecord, PaymentError> {
        let capture = self.paypal.capture(provider_token).await?;
        if !capture.completed {
            return Err(PaymentError::NotCompleted);
        }
        Ok(self
            .lifecycle
            .confirm_payment(order_id, customer_email)
            .await?)
    }

    /// Normalized provider event: payment confirmed.
    pub async fn on_payment_confirmed(
        &self,
        order_id: &str,
    ) -> Result<OrderRecord, PaymentError> {
        Ok(self.lifecycle.confirm_payment(order_id, None).await?)
    }

    /// Normalized provider event: payment denied.
    pub async fn on_payment_denied(&self, order_id: &str) -> Result<OrderRecord, PaymentError> {
        Ok(self.lifecycle.payment_denied(order_id).await?)
    }

    /// Normalized provider event: checkout session expired.
    pub async fn on_payment_expired(&self, order_id: &str) -> Result<OrderRecord, PaymentError> {
        Ok(self.lifecycle.payment_denied(order_id).await?)
    }
}
