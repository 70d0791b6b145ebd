//! Notification outbox
//!
//! Order workflows never talk to the mailer or the realtime transport
//! directly. They enqueue a typed record; the worker here drains the queue
//! and delivers, retrying a bounded number of times. A delivery failure can
//! therefore never fail the request that triggered it.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::models::{NotificationKind, OutboxRecord};
use crate::db::repository::OutboxRepository;
use crate::invoice::MailSender;
use crate::notify::realtime::RealtimeNotifier;

/// Give up on a record after this many delivery attempts
const MAX_ATTEMPTS: i32 = 5;
/// Batch size per poll
const BATCH_SIZE: i64 = 20;

/// Enqueue-side API used by order workflows.
#[derive(Clone)]
pub struct Notifier {
    outbox: OutboxRepository,
}

impl Notifier {
    pub fn new(outbox: OutboxRepository) -> Self {
        Self { outbox }
    }

    /// Queue a realtime alert for the fulfilling location.
    pub async fn order_paid(&self, order: &crate::db::models::OrderRecord) {
        let record = OutboxRecord::new(
            NotificationKind::OrderPaid,
            Some(order.location_id.clone()),
            order.order_id.clone(),
            json!({
                "order_id": order.order_id,
                "address": order.delivery.address,
                "total_price": order.total_price,
                "created_at": shared::util::now_millis(),
            }),
        );
        if let Err(e) = self.outbox.enqueue(&record).await {
            tracing::warn!(order = %order.order_id, error = %e, "Failed to enqueue order notification");
        }
    }

    /// Queue the invoice email for the customer.
    pub async fn invoice_email(
        &self,
        order: &crate::db::models::OrderRecord,
        to: &str,
        invoice_url: &str,
    ) {
        let record = OutboxRecord::new(
            NotificationKind::InvoiceEmail,
            None,
            order.order_id.clone(),
            json!({
                "to": to,
                "subject": format!("Your order {} invoice", order.custom_id),
                "attachment_url": invoice_url,
            }),
        );
        if let Err(e) = self.outbox.enqueue(&record).await {
            tracing::warn!(order = %order.order_id, error = %e, "Failed to enqueue invoice email");
        }
    }
}

/// Delivery worker: polls the outbox and pushes records out.
pub struct OutboxWorker {
    outbox: OutboxRepository,
    realtime: RealtimeNotifier,
    mailer: Arc<dyn MailSender>,
    poll_interval: Duration,
}

impl OutboxWorker {
    pub fn new(
        outbox: OutboxRepository,
        realtime: RealtimeNotifier,
        mailer: Arc<dyn MailSender>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            outbox,
            realtime,
            mailer,
            poll_interval,
        }
    }

    /// Run until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Outbox worker shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.drain_once().await;
                }
            }
        }
    }

    /// One poll cycle. Public so tests can drive it without the timer.
    pub async fn drain_once(&self) {
        let records = match self.outbox.fetch_pending(BATCH_SIZE).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch pending notifications");
                return;
            }
        };

        for record in records {
            match self.deliver(&record).await {
                Ok(()) => {
                    if let Err(e) = self.outbox.mark_sent(&record.record_id).await {
                        tracing::warn!(record = %record.record_id, error = %e, "Failed to mark notification sent");
                    }
                }
                Err(e) => {
                    tracing::warn!(record = %record.record_id, error = %e, "Notification delivery failed");
                    if let Err(e) = self
                        .outbox
                        .mark_attempt_failed(&record.record_id, MAX_ATTEMPTS)
                        .await
                    {
                        tracing::warn!(record = %record.record_id, error = %e, "Failed to record delivery attempt");
                    }
                }
            }
        }
    }

    async fn deliver(&self, record: &OutboxRecord) -> Result<(), String> {
        match record.kind {
            NotificationKind::OrderPaid => {
                let location_id = record
                    .location_id
                    .as_deref()
                    .ok_or_else(|| "order-paid record without location".to_string())?;
                self.realtime
                    .publish(location_id, record.payload.clone())
                    .await;
                Ok(())
            }
            NotificationKind::InvoiceEmail => {
                let to = record.payload["to"]
                    .as_str()
                    .ok_or_else(|| "invoice-email record without recipient".to_string())?;
                let subject = record.payload["subject"].as_str().unwrap_or("Your invoice");
                let attachment = record.payload["attachment_url"].as_str();
                self.mailer
                    .send(to, subject, attachment)
                    .await
                    .map_err(|e| e.to_string())
            }
        }
    }
}
