//! Order Repository
//!
//! Lifecycle mutations are compare-and-swap: every status write names the
//! expected pre-state in its WHERE clause and returns the row only when the
//! swap happened. Two concurrent confirmations therefore cannot both win.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::OrderRecord;
use shared::order::{OrderStatus, PaymentMethod, PaymentStatus};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, order: &OrderRecord) -> RepoResult<OrderRecord> {
        let created: Option<OrderRecord> = self
            .base
            .db()
            .query("CREATE order CONTENT $data RETURN AFTER")
            .bind(("data", order.clone()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        created.ok_or_else(|| RepoError::Database("order create returned nothing".into()))
    }

    pub async fn find_by_id(&self, order_id: &str) -> RepoResult<Option<OrderRecord>> {
        let order: Option<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order \
                 WHERE order_id = $order_id AND is_deleted = false LIMIT 1",
            )
            .bind(("order_id", order_id.to_string()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(order)
    }

    /// The user's existing Pending order awaiting a redirect payment, if any.
    ///
    /// Enforces the single-pending-checkout invariant: at most one Card or
    /// PayPal order may sit unpaid per user.
    pub async fn find_pending_redirect_by_user(
        &self,
        user_id: &str,
    ) -> RepoResult<Option<OrderRecord>> {
        let order: Option<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order \
                 WHERE user_id = $user_id \
                   AND status = $status \
                   AND payment_method IN $methods \
                   AND is_deleted = false \
                 LIMIT 1",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("status", OrderStatus::Pending))
            .bind(("methods", vec![PaymentMethod::Card, PaymentMethod::PayPal]))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(order)
    }

    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<OrderRecord>> {
        let orders: Vec<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order \
                 WHERE user_id = $user_id AND is_deleted = false \
                 ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(orders)
    }

    pub async fn find_by_location(
        &self,
        location_id: &str,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<OrderRecord>> {
        let orders: Vec<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order \
                 WHERE location_id = $location_id AND is_deleted = false \
                 ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("location_id", location_id.to_string()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(orders)
    }

    pub async fn find_all(&self, limit: i64, offset: i64) -> RepoResult<Vec<OrderRecord>> {
        let orders: Vec<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order WHERE is_deleted = false \
                 ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(orders)
    }

    /// Compare-and-swap status transition.
    ///
    /// Returns the updated row when the order was still in `from`, `None`
    /// when another writer got there first (or the order is gone).
    pub async fn transition(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        updated_by: Option<String>,
        reason: Option<String>,
    ) -> RepoResult<Option<OrderRecord>> {
        let updated: Option<OrderRecord> = self
            .base
            .db()
            .query(
                "UPDATE order SET \
                    status = $to, \
                    updated_by = $updated_by, \
                    reason = $reason, \
                    updated_at = $updated_at \
                 WHERE order_id = $order_id \
                   AND status = $from \
                   AND is_deleted = false \
                 RETURN AFTER",
            )
            .bind(("order_id", order_id.to_string()))
            .bind(("from", from))
            .bind(("to", to))
            .bind(("updated_by", updated_by))
            .bind(("reason", reason))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(updated)
    }

    /// Settle payment: Pending/unpaid -> Processing/paid, provider handles
    /// cleared, all in one guarded write. `None` means the payment was
    /// already processed (or the order vanished) - the idempotency signal
    /// for duplicate confirmations.
    pub async fn settle_payment(&self, order_id: &str) -> RepoResult<Option<OrderRecord>> {
        let updated: Option<OrderRecord> = self
            .base
            .db()
            .query(
                "UPDATE order SET \
                    status = $processing, \
                    payment_status = $paid, \
                    checkout_session_url = NONE, \
                    approval_url = NONE, \
                    updated_at = $updated_at \
                 WHERE order_id = $order_id \
                   AND status = $pending \
                   AND payment_status = $unpaid \
                   AND is_deleted = false \
                 RETURN AFTER",
            )
            .bind(("order_id", order_id.to_string()))
            .bind(("processing", OrderStatus::Processing))
            .bind(("paid", PaymentStatus::Paid))
            .bind(("pending", OrderStatus::Pending))
            .bind(("unpaid", PaymentStatus::Pending))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(updated)
    }

    /// Store the provider redirect handle produced at payment initiation.
    pub async fn set_payment_url(
        &self,
        order_id: &str,
        method: PaymentMethod,
        url: &str,
    ) -> RepoResult<()> {
        let field = match method {
            PaymentMethod::Card => "checkout_session_url",
            PaymentMethod::PayPal => "approval_url",
            PaymentMethod::Wallet => return Ok(()),
        };
        self.base
            .db()
            .query(format!(
                "UPDATE order SET {field} = $url, updated_at = $updated_at \
                 WHERE order_id = $order_id"
            ))
            .bind(("order_id", order_id.to_string()))
            .bind(("url", url.to_string()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Drop any stored provider handles (cancellation cleanup).
    pub async fn clear_payment_handles(&self, order_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE order SET \
                    checkout_session_url = NONE, \
                    approval_url = NONE, \
                    updated_at = $updated_at \
                 WHERE order_id = $order_id",
            )
            .bind(("order_id", order_id.to_string()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Attach the rendered invoice artifact.
    pub async fn set_invoice(&self, order_id: &str, url: &str, key: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE order SET \
                    invoice_url = $url, \
                    invoice_key = $key, \
                    updated_at = $updated_at \
                 WHERE order_id = $order_id",
            )
            .bind(("order_id", order_id.to_string()))
            .bind(("url", url.to_string()))
            .bind(("key", key.to_string()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Detach the invoice artifact (cancellation cleanup).
    pub async fn clear_invoice(&self, order_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE order SET \
                    invoice_url = NONE, \
                    invoice_key = NONE, \
                    updated_at = $updated_at \
                 WHERE order_id = $order_id",
            )
            .bind(("order_id", order_id.to_string()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Pending orders that never reached payment before the cutoff.
    pub async fn find_stale_pending(&self, cutoff_ms: i64) -> RepoResult<Vec<OrderRecord>> {
        let orders: Vec<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order \
                 WHERE status = $pending \
                   AND created_at < $cutoff \
                   AND is_deleted = false",
            )
            .bind(("pending", OrderStatus::Pending))
            .bind(("cutoff", cutoff_ms))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(orders)
    }

    /// Remove an abandoned order outright (idle sweep).
    pub async fn delete(&self, order_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("DELETE order WHERE order_id = $order_id")
            .bind(("order_id", order_id.to_string()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }
}
