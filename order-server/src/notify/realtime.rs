//! Realtime order notifications
//!
//! Fulfilling locations subscribe to their own room over Socket.IO; a paid
//! order publishes a summary into that room. Delivery is best-effort and
//! must never block or fail order confirmation.

use serde_json::Value;
use socketioxide::SocketIo;
use socketioxide::extract::{Data, SocketRef};

/// Event name consumed by location dashboards
const ORDER_EVENT: &str = "orderNotification";

/// Thin wrapper around the Socket.IO handle.
///
/// Constructed with `None` in wiring that has no realtime transport (tests,
/// CLI tools); every publish then degrades to a log line.
#[derive(Clone, Default)]
pub struct RealtimeNotifier {
    io: Option<SocketIo>,
}

impl RealtimeNotifier {
    pub fn new(io: SocketIo) -> Self {
        Self { io: Some(io) }
    }

    pub fn disabled() -> Self {
        Self { io: None }
    }

    /// Register the namespace handler: clients join the room of the
    /// location they fulfil.
    pub fn register(io: &SocketIo) {
        io.ns("/", async |socket: SocketRef| {
            tracing::debug!(sid = %socket.id, "Realtime client connected");
            socket.on("subscribe", async |socket: SocketRef, Data::<String>(location_id)| {
                tracing::debug!(sid = %socket.id, location = %location_id, "Client subscribed to location");
                socket.join(location_id);
            });
        });
    }

    /// Publish an order summary to the location's room. Best-effort.
    pub async fn publish(&self, location_id: &str, payload: Value) {
        let Some(io) = &self.io else {
            tracing::debug!(location = %location_id, "Realtime disabled, dropping notification");
            return;
        };
        if let Err(e) = io
            .to(location_id.to_string())
            .emit(ORDER_EVENT, &payload)
            .await
        {
            tracing::warn!(location = %location_id, error = %e, "Failed to publish order notification");
        }
    }
}
