//! Invoice collaborators
//!
//! The core only needs three capabilities: render an order snapshot into a
//! document, store that document somewhere permanent, and send it to the
//! customer. Real renderers/stores/mailers live outside this crate; the
//! traits here are the seam, and the logging implementations are the
//! default wiring for deployments that have not configured real ones.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::OrderRecord;
use crate::db::repository::OrderRepository;

/// Failure in an external collaborator (renderer, blob store, mailer)
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// A rendered invoice document
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A stored invoice artifact
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub url: String,
    pub key: String,
}

/// Renders an order snapshot into a document artifact
#[async_trait]
pub trait InvoiceRenderer: Send + Sync {
    async fn render(&self, order: &OrderRecord) -> Result<InvoiceDocument, CollaboratorError>;
}

/// Stores and deletes rendered documents
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, document: &InvoiceDocument) -> Result<StoredBlob, CollaboratorError>;
    async fn delete(&self, key: &str) -> Result<(), CollaboratorError>;
}

/// Sends mail with an optional attachment URL
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        attachment_url: Option<&str>,
    ) -> Result<(), CollaboratorError>;
}

// ============================================================================
// Default (logging) implementations
// ============================================================================

/// Renders a plain-text order summary. Stand-in until a real renderer is
/// wired up.
#[derive(Debug, Default)]
pub struct TextInvoiceRenderer;

#[async_trait]
impl InvoiceRenderer for TextInvoiceRenderer {
    async fn render(&self, order: &OrderRecord) -> Result<InvoiceDocument, CollaboratorError> {
        let mut body = format!(
            "Invoice for order {}\nPlaced: {} {}\n\n",
            order.order_id, order.order_date, order.order_time
        );
        for item in &order.items {
            body.push_str(&format!(
                "{} x{} @ {:.2} = {:.2}\n",
                item.title, item.quantity, item.unit_price, item.line_total
            ));
        }
        body.push_str(&format!(
            "\nDiscount: {:.2}\nTax: {:.2}\nTotal: {:.2}\n",
            order.discount, order.tax, order.total_price
        ));
        Ok(InvoiceDocument {
            filename: format!("invoice-{}.txt", order.custom_id),
            bytes: body.into_bytes(),
        })
    }
}

/// Keeps nothing; hands back a synthetic URL and logs the upload.
#[derive(Debug, Default)]
pub struct LoggingBlobStore;

#[async_trait]
impl BlobStore for LoggingBlobStore {
    async fn upload(&self, document: &InvoiceDocument) -> Result<StoredBlob, CollaboratorError> {
        tracing::info!(file = %document.filename, size = document.bytes.len(), "Invoice stored (logging blob store)");
        Ok(StoredBlob {
            url: format!("blob://invoices/{}", document.filename),
            key: document.filename.clone(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), CollaboratorError> {
        tracing::info!(key = %key, "Invoice deleted (logging blob store)");
        Ok(())
    }
}

/// Logs outbound mail instead of delivering it.
#[derive(Debug, Default)]
pub struct LoggingMailSender;

#[async_trait]
impl MailSender for LoggingMailSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        attachment_url: Option<&str>,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(to = %to, subject = %subject, attachment = ?attachment_url, "Mail sent (logging sender)");
        Ok(())
    }
}

// ============================================================================
// Invoice service
// ============================================================================

/// Render + store an invoice and attach it to the order; detach and delete
/// it again on cancellation.
#[derive(Clone)]
pub struct InvoiceService {
    renderer: std::sync::Arc<dyn InvoiceRenderer>,
    blobs: std::sync::Arc<dyn BlobStore>,
    orders: OrderRepository,
}

impl InvoiceService {
    pub fn new(
        renderer: std::sync::Arc<dyn InvoiceRenderer>,
        blobs: std::sync::Arc<dyn BlobStore>,
        orders: OrderRepository,
    ) -> Self {
        Self {
            renderer,
            blobs,
            orders,
        }
    }

    /// Produce and attach the invoice artifact for a paid order.
    pub async fn generate(&self, order: &OrderRecord) -> Result<StoredBlob, CollaboratorError> {
        let document = self.renderer.render(order).await?;
        let blob = self.blobs.upload(&document).await?;
        self.orders
            .set_invoice(&order.order_id, &blob.url, &blob.key)
            .await
            .map_err(|e| CollaboratorError(format!("failed to attach invoice: {e}")))?;
        Ok(blob)
    }

    /// Remove a previously generated invoice asset, if any.
    ///
    /// Best-effort: a blob-store failure is logged, not propagated, so
    /// cancellation never gets stuck on storage hiccups.
    pub async fn discard(&self, order: &OrderRecord) {
        if let Some(key) = &order.invoice_key {
            if let Err(e) = self.blobs.delete(key).await {
                tracing::warn!(order = %order.order_id, error = %e, "Failed to delete invoice asset");
            }
        }
        if let Err(e) = self.orders.clear_invoice(&order.order_id).await {
            tracing::warn!(order = %order.order_id, error = %e, "Failed to detach invoice");
        }
    }
}
