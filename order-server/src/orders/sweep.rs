//! Idle order sweep
//!
//! Pending orders that never reached payment accumulate when customers
//! abandon a hosted checkout. A periodic task removes those older than the
//! configured TTL. Coupon usage is intentionally not released here; only an
//! explicit cancellation restores eligibility.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::repository::OrderRepository;

pub struct IdleOrderSweep {
    orders: OrderRepository,
    ttl_minutes: i64,
    interval: Duration,
}

impl IdleOrderSweep {
    pub fn new(orders: OrderRepository, ttl_minutes: i64, interval: Duration) -> Self {
        Self {
            orders,
            ttl_minutes,
            interval,
        }
    }

    /// Run until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            ttl_minutes = self.ttl_minutes,
            "Idle order sweep started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Idle order sweep shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// One sweep pass. Public so tests can drive it without the timer.
    pub async fn sweep_once(&self) -> usize {
        let cutoff = shared::util::now_millis() - self.ttl_minutes * 60 * 1000;
        let stale = match self.orders.find_stale_pending(cutoff).await {
            Ok(stale) => stale,
            Err(e) => {
                tracing::warn!(error = %e, "Idle sweep query failed");
                return 0;
            }
        };

        let mut removed = 0;
        for order in stale {
            match self.orders.delete(&order.order_id).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(order = %order.order_id, error = %e, "Failed to remove expired order");
                }
            }
        }

        if removed > 0 {
            tracing::info!(count = removed, "Removed expired unpaid orders");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::OrderRecord;
    use shared::order::{DeliveryInfo, OrderStatus, PaymentMethod, PaymentStatus};

    async fn seed(orders: &OrderRepository, status: OrderStatus, age_minutes: i64) -> OrderRecord {
        let created_at = shared::util::now_millis() - age_minutes * 60 * 1000;
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
            discounted_subtotal: 10.0,
            tax: 0.7,
            total_price: 10.7,
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Pending,
            status,
            order_date: "2026-08-07".into(),
            order_time: "18:30".into(),
            reason: None,
            invoice_url: None,
            invoice_key: None,
            checkout_session_url: None,
            approval_url: None,
            updated_by: None,
            is_deleted: false,
            created_at,
            updated_at: created_at,
        };
        orders.create(&order).await.unwrap()
    }

    #[tokio::test]
    async fn removes_only_stale_pending_orders() {
        let db = db::connect_in_memory().await.unwrap();
        let orders = OrderRepository::new(db);

        let stale = seed(&orders, OrderStatus::Pending, 31).await;
        let fresh = seed(&orders, OrderStatus::Pending, 5).await;
        let paid = seed(&orders, OrderStatus::Processing, 120).await;

        let sweep = IdleOrderSweep::new(orders.clone(), 30, Duration::from_secs(60));
        let removed = sweep.sweep_once().await;

        assert_eq!(removed, 1);
        assert!(orders.find_by_id(&stale.order_id).await.unwrap().is_none());
        assert!(orders.find_by_id(&fresh.order_id).await.unwrap().is_some());
        assert!(orders.find_by_id(&paid.order_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_is_a_noop_when_nothing_is_stale() {
        let db = db::connect_in_memory().await.unwrap();
        let orders = OrderRepository::new(db);
        seed(&orders, OrderStatus::Pending, 1).await;

        let sweep = IdleOrderSweep::new(orders.clone(), 30, Duration::from_secs(60));
        assert_eq!(sweep.sweep_once().await, 0);
    }
}
