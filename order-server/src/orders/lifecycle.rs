//! Order lifecycle
//!
//! The single authority for order status transitions:
//!
//! ```text
//! Pending -> Processing -> Completed
//! Pending -> Cancelled
//! Pending | Processing -> Rejected
//! ```
//!
//! Every transition is compare-and-swap guarded in the store, so two
//! concurrent confirmations (a webhook and a success-redirect reporting the
//! same payment) cannot both apply side effects. Terminal states accept no
//! further transitions.

use thiserror::Error;

use shared::order::{OrderStatus, PaymentStatus};

use crate::coupons::{CouponError, CouponValidator};
use crate::db::models::OrderRecord;
use crate::db::repository::{OrderRepository, RepoError};
use crate::invoice::InvoiceService;
use crate::loyalty::{LedgerError, LoyaltyLedger};
use crate::notify::Notifier;
use crate::utils::AppError;

/// Lifecycle failures
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Payment already processed for order {0}")]
    AlreadyProcessed(String),

    #[error("Order {order_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Coupon(#[from] CouponError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(msg) => AppError::NotFound(msg),
            OrderError::AlreadyProcessed(id) => AppError::AlreadyProcessed(id),
            OrderError::InvalidTransition { .. } => AppError::State(err.to_string()),
            OrderError::Repo(e) => e.into(),
            OrderError::Ledger(e) => match e {
                LedgerError::InsufficientBalance { .. } | LedgerError::InsufficientPoints { .. } => {
                    AppError::InsufficientFunds(e.to_string())
                }
                LedgerError::InvalidRedemptionGranularity(_) | LedgerError::InvalidAmount(_) => {
                    AppError::Validation(e.to_string())
                }
                LedgerError::Repo(e) => e.into(),
            },
            OrderError::Coupon(e) => match e {
                CouponError::InvalidOrExpired => AppError::Validation(e.to_string()),
                CouponError::Repo(e) => e.into(),
            },
        }
    }
}

#[derive(Clone)]
pub struct OrderLifecycle {
    orders: OrderRepository,
    coupons: CouponValidator,
    ledger: LoyaltyLedger,
    invoices: InvoiceService,
    notifier: Notifier,
}

impl OrderLifecycle {
    pub fn new(
        orders: OrderRepository,
        coupons: CouponValidator,
        ledger: LoyaltyLedger,
        invoices: InvoiceService,
        notifier: Notifier,
    ) -> Self {
        Self {
            orders,
            coupons,
            ledger,
            invoices,
            notifier,
        }
    }

    /// Payment confirmed: Pending/unpaid -> Processing/paid.
    ///
    /// Idempotent: an already-paid order fails softly with
    /// [`OrderError::AlreadyProcessed`] and no side effects rerun.
    ///
    /// Side effects on first confirmation: invoice generation, loyalty
    /// reward, realtime notification to the fulfilling location. Each is
    /// individually resilient; a failing collaborator is logged and does
    /// not undo the settlement.
    pub async fn confirm_payment(
        &self,
        order_id: &str,
        customer_email: Option<&str>,
    ) -> Result<OrderRecord, OrderError> {
        let existing = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        if existing.payment_status == PaymentStatus::Paid {
            return Err(OrderError::AlreadyProcessed(order_id.to_string()));
        }
        if existing.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: existing.status,
                to: OrderStatus::Processing,
            });
        }

        // The CAS write is the commit point; a concurrent confirmation that
        // lost the race lands here with None.
        let Some(order) = self.orders.settle_payment(order_id).await? else {
            return Err(OrderError::AlreadyProcessed(order_id.to_string()));
        };

        tracing::info!(order = %order.order_id, total = order.total_price, "Payment confirmed");

        match self.invoices.generate(&order).await {
            Ok(blob) => {
                if let Some(email) = customer_email {
                    self.notifier.invoice_email(&order, email, &blob.url).await;
                } else {
                    tracing::debug!(order = %order.order_id, "No customer email on this confirmation path, skipping invoice mail");
                }
            }
            Err(e) => {
                tracing::error!(order = %order.order_id, error = %e, "Invoice generation failed");
            }
        }

        if let Err(e) = self
            .ledger
            .reward(&order.user_id, &order.order_id, order.total_price)
            .await
        {
            tracing::error!(order = %order.order_id, error = %e, "Loyalty reward failed");
        }

        self.notifier.order_paid(&order).await;

        Ok(order)
    }

    /// Provider reported the payment denied or the session expired.
    ///
    /// Treated as a cancellation of the still-Pending order; an order that
    /// already left Pending is reported as already processed.
    pub async fn payment_denied(&self, order_id: &str) -> Result<OrderRecord, OrderError> {
        self.cancel_internal(order_id, None, Some("payment denied or expired".to_string()))
            .await
    }

    /// User-requested cancellation of a Pending order.
    pub async fn cancel(
        &self,
        order_id: &str,
        cancelled_by: &str,
        reason: Option<String>,
    ) -> Result<OrderRecord, OrderError> {
        self.cancel_internal(order_id, Some(cancelled_by.to_string()), reason)
            .await
    }

    async fn cancel_internal(
        &self,
        order_id: &str,
        cancelled_by: Option<String>,
        reason: Option<String>,
    ) -> Result<OrderRecord, OrderError> {
        let existing = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        let Some(order) = self
            .orders
            .transition(
                order_id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                cancelled_by,
                reason,
            )
            .await?
        else {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: existing.status,
                to: OrderStatus::Cancelled,
            });
        };

        self.cleanup_after_terminal(&order).await?;
        tracing::info!(order = %order.order_id, "Order cancelled");
        Ok(order)
    }

    /// Fulfillment marked the order delivered: Processing -> Completed.
    pub async fn deliver(
        &self,
        order_id: &str,
        updated_by: &str,
    ) -> Result<OrderRecord, OrderError> {
        let existing = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        let Some(order) = self
            .orders
            .transition(
                order_id,
                OrderStatus::Processing,
                OrderStatus::Completed,
                Some(updated_by.to_string()),
                None,
            )
            .await?
        else {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: existing.status,
                to: OrderStatus::Completed,
            });
        };

        tracing::info!(order = %order.order_id, by = %updated_by, "Order delivered");
        Ok(order)
    }

    /// Administrative rejection from any non-terminal state.
    pub async fn reject(
        &self,
        order_id: &str,
        updated_by: &str,
        reason: Option<String>,
    ) -> Result<OrderRecord, OrderError> {
        let existing = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        if existing.status.is_terminal() {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: existing.status,
                to: OrderStatus::Rejected,
            });
        }

        // CAS from the observed state; a concurrent transition surfaces as
        // an invalid transition rather than a silent overwrite.
        let Some(order) = self
            .orders
            .transition(
                order_id,
                existing.status,
                OrderStatus::Rejected,
                Some(updated_by.to_string()),
                reason,
            )
            .await?
        else {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: existing.status,
                to: OrderStatus::Rejected,
            });
        };

        self.cleanup_after_terminal(&order).await?;
        tracing::info!(order = %order.order_id, by = %updated_by, "Order rejected");
        Ok(order)
    }

    /// Shared cleanup for Cancelled/Rejected: release the coupon usage,
    /// delete any generated invoice asset, drop provider handles.
    async fn cleanup_after_terminal(&self, order: &OrderRecord) -> Result<(), OrderError> {
        if let Some(coupon_id) = &order.coupon_id {
            self.coupons.release(coupon_id, &order.user_id).await?;
        }
        self.invoices.discard(order).await;
        self.orders.clear_payment_handles(&order.order_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::Coupon;
    use crate::db::repository::{CouponRepository, WalletRepository};
    use crate::invoice::{LoggingBlobStore, TextInvoiceRenderer};
    use crate::notify::Notifier;
    use crate::utils::KeyedMutex;
    use shared::order::{DeliveryInfo, PaymentMethod};
    use std::sync::Arc;
    use surrealdb::Surreal;
    use surrealdb::engine::local::Db;

    async fn setup() -> (Surreal<Db>, OrderLifecycle, OrderRepository) {
        let db = db::connect_in_memory().await.unwrap();
        let orders = OrderRepository::new(db.clone());
        let lifecycle = OrderLifecycle::new(
            orders.clone(),
            CouponValidator::new(CouponRepository::new(db.clone())),
            LoyaltyLedger::new(WalletRepository::new(db.clone()), Arc::new(KeyedMutex::new())),
            InvoiceService::new(
                Arc::new(TextInvoiceRenderer),
                Arc::new(LoggingBlobStore),
                orders.clone(),
            ),
            Notifier::new(crate::db::repository::OutboxRepository::new(db.clone())),
        );
        (db, lifecycle, orders)
    }

    async fn seed_order(orders: &OrderRepository, status: OrderStatus) -> OrderRecord {
        let now = shared::util::now_millis();
        let order = OrderRecord {
            order_id: shared::util::next_id("ord"),
            custom_id: shared::util::next_id("cus"),
            location_id: "loc_1".into(),
            user_id: "usr_1".into(),
            delivery: DeliveryInfo {
                address: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                phone: "555-0100".into(),
            },
            items: vec![],
            coupon_id: None,
            discount: 0.0,
            discounted_subtotal: 45.0,
            tax: 3.15,
            total_price: 48.15,
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Pending,
            status,
            order_date: "2026-08-07".into(),
            order_time: "18:30".into(),
            reason: None,
            invoice_url: None,
            invoice_key: None,
            checkout_session_url: Some("https://checkout.example/s/123".into()),
            approval_url: None,
            updated_by: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        orders.create(&order).await.unwrap()
    }

    #[tokio::test]
    async fn confirm_moves_pending_to_processing_with_side_effects() {
        let (db, lifecycle, orders) = setup().await;
        let order = seed_order(&orders, OrderStatus::Pending).await;

        let confirmed = lifecycle
            .confirm_payment(&order.order_id, Some("user@example.com"))
            .await
            .unwrap();

        assert_eq!(confirmed.status, OrderStatus::Processing);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert!(confirmed.checkout_session_url.is_none());

        // Invoice attached
        let stored = orders.find_by_id(&order.order_id).await.unwrap().unwrap();
        assert!(stored.invoice_url.is_some());

        // Loyalty rewarded: floor(48.15 * 10) = 481
        let ledger =
            LoyaltyLedger::new(WalletRepository::new(db.clone()), Arc::new(KeyedMutex::new()));
        let wallet = ledger.wallet("usr_1").await.unwrap();
        assert_eq!(wallet.points, 481);
    }

    #[tokio::test]
    async fn duplicate_confirmation_is_already_processed_and_rewards_once() {
        let (db, lifecycle, orders) = setup().await;
        let order = seed_order(&orders, OrderStatus::Pending).await;

        lifecycle
            .confirm_payment(&order.order_id, None)
            .await
            .unwrap();
        let err = lifecycle
            .confirm_payment(&order.order_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::AlreadyProcessed(_)));

        let ledger =
            LoyaltyLedger::new(WalletRepository::new(db.clone()), Arc::new(KeyedMutex::new()));
        let wallet = ledger.wallet("usr_1").await.unwrap();
        let reward_count = wallet
            .transactions
            .iter()
            .filter(|t| t.order_id.as_deref() == Some(order.order_id.as_str()))
            .count();
        assert_eq!(reward_count, 1);
    }

    #[tokio::test]
    async fn cancel_releases_coupon_and_clears_handles() {
        let (db, lifecycle, orders) = setup().await;
        let coupons = CouponRepository::new(db.clone());
        let coupon = coupons
            .create(&Coupon {
                coupon_id: "cpn_1".into(),
                name: "SAVE10".into(),
                amount: 10.0,
                expire_at: i64::MAX,
                used_by: vec!["usr_1".into()],
                is_deleted: false,
                created_by: None,
                updated_by: None,
                created_at: 0,
            })
            .await
            .unwrap();

        let mut order = seed_order(&orders, OrderStatus::Pending).await;
        order.coupon_id = Some(coupon.coupon_id.clone());
        // Re-create with the coupon attached
        orders.delete(&order.order_id).await.unwrap();
        let order = orders.create(&order).await.unwrap();

        let cancelled = lifecycle
            .cancel(&order.order_id, "usr_1", Some("changed my mind".into()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let stored = orders.find_by_id(&order.order_id).await.unwrap().unwrap();
        assert!(stored.checkout_session_url.is_none());

        let coupon = coupons.find_by_id("cpn_1").await.unwrap().unwrap();
        assert!(coupon.used_by.is_empty());
    }

    #[tokio::test]
    async fn cancel_rejects_non_pending_orders() {
        let (_db, lifecycle, orders) = setup().await;
        let order = seed_order(&orders, OrderStatus::Processing).await;

        let err = lifecycle
            .cancel(&order.order_id, "usr_1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let stored = orders.find_by_id(&order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn deliver_requires_processing() {
        let (_db, lifecycle, orders) = setup().await;

        let pending = seed_order(&orders, OrderStatus::Pending).await;
        let err = lifecycle
            .deliver(&pending.order_id, "staff_1")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let processing = seed_order(&orders, OrderStatus::Processing).await;
        let delivered = lifecycle
            .deliver(&processing.order_id, "staff_1")
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Completed);
        assert_eq!(delivered.updated_by.as_deref(), Some("staff_1"));
    }

    #[tokio::test]
    async fn terminal_states_absorb_nothing() {
        let (_db, lifecycle, orders) = setup().await;

        for status in [
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
        ] {
            let order = seed_order(&orders, status).await;

            let err = lifecycle
                .reject(&order.order_id, "admin_1", None)
                .await
                .unwrap_err();
            assert!(matches!(err, OrderError::InvalidTransition { .. }));

            let err = lifecycle
                .deliver(&order.order_id, "staff_1")
                .await
                .unwrap_err();
            assert!(matches!(err, OrderError::InvalidTransition { .. }));

            let stored = orders.find_by_id(&order.order_id).await.unwrap().unwrap();
            assert_eq!(stored.status, status);
        }
    }

    #[tokio::test]
    async fn reject_works_from_pending_and_processing() {
        let (_db, lifecycle, orders) = setup().await;

        let pending = seed_order(&orders, OrderStatus::Pending).await;
        let rejected = lifecycle
            .reject(&pending.order_id, "admin_1", Some("fraud".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);

        let processing = seed_order(&orders, OrderStatus::Processing).await;
        let rejected = lifecycle
            .reject(&processing.order_id, "admin_1", None)
            .await
            .unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn payment_denied_cancels_pending_order() {
        let (_db, lifecycle, orders) = setup().await;
        let order = seed_order(&orders, OrderStatus::Pending).await;

        let cancelled = lifecycle.payment_denied(&order.order_id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }
}
