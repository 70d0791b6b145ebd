//! Payment API Handlers
//!
//! Callbacks are driven by the returning customer; webhooks by the
//! provider. Both funnel into the same idempotent lifecycle events, so a
//! webhook and a success-redirect reporting the same payment settle it
//! exactly once.
//!
//! Webhook responses follow the retry contract: 2xx when the event was
//! handled or intentionally ignored, non-2xx only when redelivery is
//! wanted.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

use shared::ApiResponse;
use shared::order::OrderStatus;

use crate::auth::Identity;
use crate::core::ServerState;
use crate::db::models::OrderRecord;
use crate::db::repository::OrderRepository;
use crate::orders::OrderError;
use crate::payments::provider::WebhookHeaders;
use crate::payments::{PaymentError, parse_card_event, verify_card_signature};
use crate::utils::{AppError, AppResult, ok, ok_with_message};

/// Query params for the card success redirect
#[derive(Debug, Deserialize)]
pub struct CardSuccessQuery {
    pub order_id: String,
    pub session_id: String,
}

/// Customer returned from the hosted card page
pub async fn card_success(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<CardSuccessQuery>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let order = state
        .gateway()
        .confirm_card_redirect(
            &query.order_id,
            &query.session_id,
            identity.email.as_deref(),
        )
        .await
        .map_err(AppError::from)?;
    Ok(ok_with_message(
        order,
        "Card payment successful! Your order is being prepared.",
    ))
}

/// Query params for cancel redirects
#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub order_id: String,
}

/// Customer backed out of the hosted card page
pub async fn card_cancel(
    State(state): State<ServerState>,
    _identity: Identity,
    Query(query): Query<CancelQuery>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    cancel_abandoned(&state, &query.order_id).await
}

/// Query params for the PayPal return callback
#[derive(Debug, Deserialize)]
pub struct PayPalSuccessQuery {
    pub order_id: String,
    /// Provider order token to capture
    pub token: String,
}

/// Customer approved the PayPal order; capture and settle
pub async fn paypal_success(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<PayPalSuccessQuery>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let order = state
        .gateway()
        .confirm_paypal_capture(&query.order_id, &query.token, identity.email.as_deref())
        .await
        .map_err(AppError::from)?;
    Ok(ok_with_message(order, "PayPal payment was accepted"))
}

/// Customer backed out of the PayPal approval page
pub async fn paypal_cancel(
    State(state): State<ServerState>,
    _identity: Identity,
    Query(query): Query<CancelQuery>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    cancel_abandoned(&state, &query.order_id).await
}

/// Shared cancel-redirect handling: an already-cancelled order answers
/// calmly instead of erroring, so double-clicking the cancel link is safe.
async fn cancel_abandoned(
    state: &ServerState,
    order_id: &str,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let existing = OrderRepository::new(state.db.clone())
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

    if existing.status == OrderStatus::Cancelled {
        return Ok(ok_with_message(existing, "Order was already cancelled."));
    }

    let cancelled = state
        .gateway()
        .on_payment_denied(order_id)
        .await
        .map_err(AppError::from)?;
    Ok(ok_with_message(
        cancelled,
        "Payment was cancelled. You can retry anytime.",
    ))
}

// ============================================================================
// Webhooks
// ============================================================================

/// Card provider webhook (signed deliveries)
pub async fn card_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get("card-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing signature header".into()))?;

    // Nothing in the payload is trusted before this verifies.
    verify_card_signature(&state.config.card_webhook_secret, signature, &body)
        .map_err(AppError::from)?;

    let event = parse_card_event(&body).map_err(AppError::from)?;
    let order_id = |event: &crate::payments::CardEvent| {
        event
            .order_id
            .clone()
            .ok_or(PaymentError::MissingOrderReference)
    };

    let result = match event.event_type.as_str() {
        "checkout.session.completed" => {
            let id = order_id(&event).map_err(AppError::from)?;
            state.gateway().on_payment_confirmed(&id).await.map(Some)
        }
        "checkout.session.expired" => {
            let id = order_id(&event).map_err(AppError::from)?;
            state.gateway().on_payment_expired(&id).await.map(Some)
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled card webhook event");
            Ok(None)
        }
    };

    ack_webhook_result(result)
}

/// PayPal provider webhook (verified against the provider)
pub async fn paypal_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(event): Json<Value>,
) -> AppResult<Json<Value>> {
    let webhook_headers = WebhookHeaders {
        transmission_id: require_header(&headers, "paypal-transmission-id")?,
        transmission_time: require_header(&headers, "paypal-transmission-time")?,
        transmission_sig: require_header(&headers, "paypal-transmission-sig")?,
        cert_url: require_header(&headers, "paypal-cert-url")?,
        auth_algo: require_header(&headers, "paypal-auth-algo")?,
    };

    let event_type = event["event_type"]
        .as_str()
        .ok_or_else(|| AppError::Validation("Invalid webhook event data".into()))?
        .to_string();
    if event["resource"].is_null() {
        return Err(AppError::Validation("Invalid webhook event data".into()));
    }

    let verified = state
        .paypal
        .verify_webhook(&webhook_headers, &event)
        .await
        .map_err(AppError::from)?;
    if !verified {
        return Err(AppError::Validation("Invalid webhook signature".into()));
    }

    let order_id = event["resource"]["custom_id"]
        .as_str()
        .map(str::to_string);
    let require_order = || {
        order_id
            .clone()
            .ok_or_else(|| AppError::from(PaymentError::MissingOrderReference))
    };

    let result = match event_type.as_str() {
        "PAYMENT.CAPTURE.COMPLETED" => {
            let id = require_order()?;
            state.gateway().on_payment_confirmed(&id).await.map(Some)
        }
        "PAYMENT.CAPTURE.DENIED" => {
            let id = require_order()?;
            state.gateway().on_payment_denied(&id).await.map(Some)
        }
        "PAYMENT.CAPTURE.REFUNDED" => {
            tracing::warn!(order = ?order_id, "Refund received; manual reconciliation required");
            Ok(None)
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled PayPal webhook event");
            Ok(None)
        }
    };

    ack_webhook_result(result)
}

fn require_header(headers: &HeaderMap, name: &str) -> Result<String, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("Missing required header: {name}")))
}

/// Translate a lifecycle result into the webhook retry contract: a
/// duplicate delivery acknowledges with 2xx (handled before), everything
/// else propagates so the provider redelivers.
fn ack_webhook_result(
    result: Result<Option<OrderRecord>, PaymentError>,
) -> AppResult<Json<Value>> {
    match result {
        Ok(_) => Ok(Json(json!({ "received": true }))),
        Err(PaymentError::Order(OrderError::AlreadyProcessed(order_id))) => {
            tracing::debug!(order = %order_id, "Duplicate payment confirmation ignored");
            Ok(Json(json!({ "received": true })))
        }
        Err(e) => Err(e.into()),
    }
}
