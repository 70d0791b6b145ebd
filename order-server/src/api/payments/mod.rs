//! Payment API Module
//!
//! Customer-facing success/cancel callbacks plus provider webhooks.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Payment router
pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/payments", callback_routes())
        .nest("/api/webhooks", webhook_routes())
}

fn callback_routes() -> Router<ServerState> {
    Router::new()
        .route("/card/success", get(handler::card_success))
        .route("/card/cancel", get(handler::card_cancel))
        .route("/paypal/success", get(handler::paypal_success))
        .route("/paypal/cancel", get(handler::paypal_cancel))
}

fn webhook_routes() -> Router<ServerState> {
    Router::new()
        .route("/card", post(handler::card_webhook))
        .route("/paypal", post(handler::paypal_webhook))
}
