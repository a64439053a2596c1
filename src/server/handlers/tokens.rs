// src/server/handlers/tokens.rs
//! Token administration endpoints

use crate::db::models::Token;
use crate::server::{ApiResult, PresentedToken, SharedState};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

/// GET /api/v1/tokens
pub async fn list_tokens(State(state): State<SharedState>) -> ApiResult<Json<Vec<Token>>> {
    Ok(Json(state.tokens.list().await?))
}

/// POST /api/v1/tokens
pub async fn issue_token(State(state): State<SharedState>) -> ApiResult<Json<Token>> {
    Ok(Json(state.tokens.issue().await?))
}

/// DELETE /api/v1/tokens/all
///
/// Revokes every token except the one the caller authenticated with.
/// A caller let in by bootstrap mode revokes nothing.
pub async fn revoke_other_tokens(
    State(state): State<SharedState>,
    Extension(PresentedToken(presented)): Extension<PresentedToken>,
) -> ApiResult<Json<Value>> {
    if let Some(keep) = presented {
        state.tokens.revoke_all_except(&keep).await?;
    }
    Ok(Json(json!({})))
}

/// DELETE /api/v1/token/:id
pub async fn revoke_token(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.tokens.revoke_one(id).await?;
    Ok(Json(json!({})))
}
