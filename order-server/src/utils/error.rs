//! Unified error handling
//!
//! Application-level error type and response envelope:
//! - [`AppError`] - application error enum
//! - [`AppResult`] - handler result alias
//!
//! # Error code ranges
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E0xxx | General (validation, not found, conflict) | E0002 validation failed |
//! | E2xxx | Permission | E2001 forbidden |
//! | E3xxx | Authentication | E3001 not logged in |
//! | E4xxx | Order lifecycle | E4001 illegal transition |
//! | E5xxx | Payment / funds | E5001 pending payment exists |
//! | E9xxx | System | E9002 database error |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use shared::ApiResponse;
use tracing::error;

use crate::db::repository::RepoError;

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication / authorization (4xx) ==========
    #[error("Authentication required")]
    /// Missing or unusable identity (401)
    Unauthorized,

    #[error("Permission denied: {0}")]
    /// Caller's role lacks the required capability (403)
    Forbidden(String),

    // ========== Request errors (4xx) ==========
    #[error("Validation failed: {0}")]
    /// Malformed or missing input, rejected before touching the store (400)
    Validation(String),

    #[error("Resource not found: {0}")]
    /// Meal / order / coupon / location / option absent (404)
    NotFound(String),

    #[error("Resource conflict: {0}")]
    /// Duplicate coupon name and similar uniqueness clashes (409)
    Conflict(String),

    // ========== Checkout / payment errors ==========
    #[error("A pending payment already exists for this user")]
    /// The user must resume or abandon the existing checkout before a new
    /// redirect-based order can be created (409, carries the resume handle)
    PendingPayment {
        order_id: String,
        payment_url: Option<String>,
    },

    #[error("Payment already processed for order {0}")]
    /// Duplicate confirmation of an already-paid order (409)
    AlreadyProcessed(String),

    #[error("Insufficient funds: {0}")]
    /// Wallet balance or points too low (400)
    InsufficientFunds(String),

    // ========== Lifecycle errors ==========
    #[error("Illegal order state transition: {0}")]
    /// Transition not allowed by the lifecycle table (422)
    State(String),

    // ========== System errors (5xx) ==========
    #[error("External service error: {0}")]
    /// Payment provider or storage collaborator failure (502)
    External(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::External(msg.into())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // PendingPayment carries data so the client can resume the existing
        // checkout instead of double-charging.
        if let AppError::PendingPayment {
            order_id,
            payment_url,
        } = &self
        {
            let body = Json(ApiResponse::error_with_data(
                "E5001",
                "You already have a pending payment. Please complete it first.",
                json!({ "order_id": order_id, "payment_url": payment_url }),
            ));
            return (StatusCode::CONFLICT, body).into_response();
        }

        let (status, code, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "E3001", "Please login first".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "E2001", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.clone()),
            AppError::PendingPayment { .. } => unreachable!("handled above"),
            AppError::AlreadyProcessed(id) => (
                StatusCode::CONFLICT,
                "E5002",
                format!("Payment already processed for order {}", id),
            ),
            AppError::InsufficientFunds(msg) => (StatusCode::BAD_REQUEST, "E5003", msg.clone()),
            AppError::State(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "E4001", msg.clone()),
            AppError::External(msg) => {
                error!(target: "external", error = %msg, "External service error");
                (
                    StatusCode::BAD_GATEWAY,
                    "E9003",
                    "External service error".to_string(),
                )
            }
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ApiResponse::<()>::error(code, message));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: serde::Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

/// Create a successful response with custom message
pub fn ok_with_message<T: serde::Serialize>(
    data: T,
    message: impl Into<String>,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok_with_message(data, message))
}
