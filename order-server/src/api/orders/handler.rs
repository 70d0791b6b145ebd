//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::ApiResponse;
use shared::order::{DeliveryInfo, MealSelection, PaymentMethod};

use crate::auth::{Identity, Role, authorize};
use crate::checkout::CheckoutRequest;
use crate::core::ServerState;
use crate::db::models::OrderRecord;
use crate::db::repository::OrderRepository;
use crate::utils::{AppError, AppResult, ok, ok_with_message};

/// Request body for placing an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 4))]
    pub phone: String,
    pub payment_type: PaymentMethod,
    #[validate(length(min = 1))]
    pub order_date: String,
    #[validate(length(min = 1))]
    pub order_time: String,
    pub coupon_name: Option<String>,
    /// Inline meals; omitted means "use my cart"
    pub meals: Option<Vec<MealSelection>>,
}

/// Response body for a placed order
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: OrderRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

/// Place an order at a location
pub async fn create_order(
    State(state): State<ServerState>,
    identity: Identity,
    Path(location_id): Path<String>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateOrderResponse>>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let request = CheckoutRequest {
        location_id,
        payment_method: payload.payment_type,
        delivery: DeliveryInfo {
            address: payload.address,
            city: payload.city,
            state: payload.state,
            phone: payload.phone,
        },
        order_date: payload.order_date,
        order_time: payload.order_time,
        coupon_name: payload.coupon_name,
        meals: payload.meals,
    };

    let outcome = state
        .checkout_service()
        .create_order(&identity.user_id, identity.email.as_deref(), request)
        .await
        .map_err(AppError::from)?;

    let (status, message) = if outcome.settled {
        (
            StatusCode::OK,
            "Order placed and paid with your wallet. It's being prepared!",
        )
    } else {
        (
            StatusCode::CREATED,
            "Order placed successfully. Proceed to payment if applicable.",
        )
    };

    Ok((
        status,
        ok_with_message(
            CreateOrderResponse {
                order: outcome.order,
                payment_url: outcome.payment_url,
            },
            message,
        ),
    ))
}

/// Query params for order listings
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// All orders (admin)
pub async fn list_all(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<OrderRecord>>>> {
    authorize(&identity, &[Role::Admin, Role::SuperAdmin])?;
    let orders = OrderRepository::new(state.db.clone())
        .find_all(query.limit, query.offset)
        .await?;
    Ok(ok(orders))
}

/// The caller's own orders
pub async fn list_mine(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<OrderRecord>>>> {
    let orders = OrderRepository::new(state.db.clone())
        .find_by_user(&identity.user_id, query.limit, query.offset)
        .await?;
    Ok(ok(orders))
}

/// Orders for the caller's location (staff)
pub async fn list_for_location(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<OrderRecord>>>> {
    authorize(&identity, &[Role::Staff, Role::Admin, Role::SuperAdmin])?;
    let location_id = identity
        .location_id
        .ok_or_else(|| AppError::NotFound("Location ID not found".into()))?;
    let orders = OrderRepository::new(state.db.clone())
        .find_by_location(&location_id, query.limit, query.offset)
        .await?;
    Ok(ok(orders))
}

/// One order; owners see their own, staff and admins see any
pub async fn get_by_id(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let order = OrderRepository::new(state.db.clone())
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;

    if order.user_id != identity.user_id {
        authorize(&identity, &[Role::Staff, Role::Admin, Role::SuperAdmin])?;
    }
    Ok(ok(order))
}

/// Request body for cancellation
#[derive(Debug, Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Cancel the caller's own Pending order
pub async fn cancel(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
    payload: Option<Json<CancelRequest>>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let order = OrderRepository::new(state.db.clone())
        .find_by_id(&id)
        .await?
        .filter(|o| o.user_id == identity.user_id)
        .ok_or_else(|| {
            AppError::NotFound(
                "Invalid order ID or you don't have permission to cancel this order".into(),
            )
        })?;

    let reason = payload.and_then(|Json(p)| p.reason);
    let cancelled = state
        .lifecycle()
        .cancel(&order.order_id, &identity.user_id, reason)
        .await
        .map_err(AppError::from)?;
    Ok(ok_with_message(cancelled, "Order cancelled successfully"))
}

/// Mark a Processing order delivered (staff at the fulfilling location)
pub async fn deliver(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    authorize(&identity, &[Role::Staff, Role::Admin, Role::SuperAdmin])?;

    let order = OrderRepository::new(state.db.clone())
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;

    // Staff may only deliver orders for their own location.
    if identity.role == Role::Staff && identity.location_id.as_deref() != Some(&order.location_id) {
        return Err(AppError::NotFound(format!("Order {id} not found")));
    }

    let delivered = state
        .lifecycle()
        .deliver(&order.order_id, &identity.user_id)
        .await
        .map_err(AppError::from)?;
    Ok(ok_with_message(delivered, "Order marked as delivered"))
}

/// Administratively reject an order
pub async fn reject(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
    payload: Option<Json<CancelRequest>>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    authorize(&identity, &[Role::Admin, Role::SuperAdmin])?;

    let reason = payload.and_then(|Json(p)| p.reason);
    let rejected = state
        .lifecycle()
        .reject(&id, &identity.user_id, reason)
        .await
        .map_err(AppError::from)?;
    Ok(ok_with_message(rejected, "Order rejected"))
}
