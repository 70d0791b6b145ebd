//! Coupon API Handlers
//!
//! Administrative CRUD. Names are stored upper-cased; uniqueness is
//! enforced by the repository's unique index.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use shared::ApiResponse;

use crate::auth::{Identity, Role, authorize};
use crate::core::ServerState;
use crate::db::models::Coupon;
use crate::db::repository::CouponRepository;
use crate::utils::{AppError, AppResult, ok, ok_with_message};

const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

/// Request body for creating a coupon
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Discount percentage
    #[validate(range(min = 1.0, max = 100.0))]
    pub amount: f64,
    /// Expiry timestamp (ms since epoch)
    pub expire_at: i64,
}

/// Request body for updating a coupon (all fields optional)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(range(min = 1.0, max = 100.0))]
    pub amount: Option<f64>,
    pub expire_at: Option<i64>,
}

/// Create a coupon
pub async fn create(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<CreateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    authorize(&identity, ADMIN_ROLES)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let coupon = Coupon {
        coupon_id: shared::util::next_id("cpn"),
        name: payload.name.to_uppercase(),
        amount: payload.amount,
        expire_at: payload.expire_at,
        used_by: vec![],
        is_deleted: false,
        created_by: Some(identity.user_id),
        updated_by: None,
        created_at: shared::util::now_millis(),
    };

    let created = CouponRepository::new(state.db.clone())
        .create(&coupon)
        .await
        .map_err(|e| match e {
            crate::db::repository::RepoError::Duplicate(_) => AppError::Conflict(
                "Coupon name already exists. Please choose another name.".into(),
            ),
            other => other.into(),
        })?;
    Ok(ok_with_message(created, "Coupon created successfully"))
}

/// List live coupons
pub async fn list(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<Vec<Coupon>>>> {
    authorize(&identity, ADMIN_ROLES)?;
    let coupons = CouponRepository::new(state.db.clone()).find_all().await?;
    Ok(ok(coupons))
}

/// Update a coupon
pub async fn update(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    authorize(&identity, ADMIN_ROLES)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if payload.name.is_none() && payload.amount.is_none() && payload.expire_at.is_none() {
        return Err(AppError::Validation(
            "You must provide at least one field to update (name, amount, or expire_at)".into(),
        ));
    }

    let repo = CouponRepository::new(state.db.clone());
    let mut coupon = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Coupon {id} not found")))?;

    if let Some(name) = payload.name {
        let normalized = name.to_uppercase();
        if normalized != coupon.name
            && repo.find_active_by_name(&normalized).await?.is_some()
        {
            return Err(AppError::Conflict(
                "Coupon name already exists. Please choose another name.".into(),
            ));
        }
        coupon.name = normalized;
    }
    if let Some(amount) = payload.amount {
        coupon.amount = amount;
    }
    if let Some(expire_at) = payload.expire_at {
        coupon.expire_at = expire_at;
    }
    coupon.updated_by = Some(identity.user_id);

    let updated = repo.update(&coupon).await?;
    Ok(ok_with_message(updated, "Coupon updated successfully"))
}

/// Soft-delete a coupon
pub async fn delete(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    authorize(&identity, ADMIN_ROLES)?;
    let deleted = CouponRepository::new(state.db.clone()).delete(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Coupon {id} not found")));
    }
    Ok(ok_with_message((), "Coupon deleted successfully"))
}
