//! Wallet API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;
use validator::Validate;

use shared::ApiResponse;

use crate::auth::Identity;
use crate::core::ServerState;
use crate::db::models::Wallet;
use crate::utils::{AppError, AppResult, ok, ok_with_message};

/// The caller's wallet (zero balances if never used)
pub async fn get_wallet(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<Wallet>>> {
    let wallet = state.ledger().wallet(&identity.user_id).await?;
    Ok(ok(wallet))
}

/// Request body for redeeming points
#[derive(Debug, Deserialize, Validate)]
pub struct RedeemRequest {
    #[validate(range(min = 1))]
    pub points: i64,
}

/// Convert points into spendable balance
pub async fn redeem(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<RedeemRequest>,
) -> AppResult<Json<ApiResponse<Wallet>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let wallet = state
        .ledger()
        .redeem(&identity.user_id, payload.points)
        .await?;
    Ok(ok_with_message(wallet, "Points redeemed successfully"))
}
