//! Cart API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;
use validator::Validate;

use shared::ApiResponse;
use shared::order::{AddonKind, MealSelection};

use crate::auth::Identity;
use crate::carts::CartView;
use crate::core::ServerState;
use crate::db::models::Cart;
use crate::utils::{AppError, AppResult, ok, ok_with_message};

/// Request body for adding a meal
#[derive(Debug, Deserialize, Validate)]
pub struct AddMealRequest {
    #[validate(length(min = 1))]
    pub meal_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 9999))]
    pub quantity: i32,
    #[serde(default)]
    pub is_combo: bool,
    #[serde(default)]
    pub sauces: Vec<String>,
    #[serde(default)]
    pub drinks: Vec<String>,
    #[serde(default)]
    pub sides: Vec<String>,
}

fn default_quantity() -> i32 {
    1
}

/// Request body for adding a standalone addon
#[derive(Debug, Deserialize, Validate)]
pub struct AddAddonRequest {
    pub kind: AddonKind,
    #[validate(length(min = 1))]
    pub option_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 9999))]
    pub quantity: i32,
}

/// Request body for selective clearing
#[derive(Debug, Deserialize, Validate)]
pub struct ClearItemsRequest {
    #[validate(length(min = 1))]
    pub meal_ids: Vec<String>,
}

/// Priced view of the caller's cart
pub async fn get_cart(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let view = state.cart_service().get_cart(&identity.user_id).await?;
    Ok(ok(view))
}

/// Add a meal selection to the caller's cart
pub async fn add_meal(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<AddMealRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let selection = MealSelection {
        meal_id: payload.meal_id,
        quantity: payload.quantity,
        is_combo: payload.is_combo,
        sauces: payload.sauces,
        drinks: payload.drinks,
        sides: payload.sides,
    };
    let cart = state
        .cart_service()
        .add_meal(&identity.user_id, selection)
        .await?;
    Ok(ok_with_message(cart, "Meal added to cart successfully"))
}

/// Add a standalone addon purchase
pub async fn add_addon(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<AddAddonRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let cart = state
        .cart_service()
        .add_standalone_addon(
            &identity.user_id,
            payload.kind,
            &payload.option_id,
            payload.quantity,
        )
        .await?;
    Ok(ok_with_message(
        cart,
        format!("{} added to cart successfully", payload.kind.as_str()),
    ))
}

/// Remove everything from the caller's cart
pub async fn clear_cart(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<()>>> {
    state.cart_service().clear_all(&identity.user_id).await?;
    Ok(ok_with_message((), "Cart cleared successfully"))
}

/// Remove the named meals from the caller's cart
pub async fn clear_items(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<ClearItemsRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .cart_service()
        .clear_items(&identity.user_id, &payload.meal_ids)
        .await?;
    Ok(ok_with_message((), "Selected cart items cleared successfully"))
}
