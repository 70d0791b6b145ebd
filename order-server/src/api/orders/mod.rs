//! Order API Module
//!
//! Checkout plus lifecycle operations. Listing is split by audience:
//! admins see everything, staff see their location, users see their own.

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/orders", routes())
        .route(
            "/api/locations/{location_id}/orders",
            post(handler::create_order),
        )
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_all))
        .route("/mine", get(handler::list_mine))
        .route("/location", get(handler::list_for_location))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", patch(handler::cancel))
        .route("/{id}/deliver", patch(handler::deliver))
        .route("/{id}/reject", patch(handler::reject))
}
