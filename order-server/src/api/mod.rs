//! HTTP API
//!
//! One router per resource module, merged here.

pub mod cart;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod payments;
pub mod wallet;

use axum::Router;

use crate::core::ServerState;

/// The complete API router
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(coupons::router())
        .merge(wallet::router())
        .merge(payments::router())
}
