use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::auth;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenRequest {
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub user_id: i64,
    pub token: String,
}

// POST /api/admin/tokens
// The shell calls this after it has authenticated the customer itself.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if !auth::is_admin(&headers, &state.config.admin_token) {
        return Err(AppError::Unauthorized);
    }

    let user = state.store.get_user(payload.user_id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to look up user for token");
        AppError::Unavailable("order store unavailable".to_string())
    })?;
    if user.is_none() {
        return Err(AppError::NotFound(format!("user {}", payload.user_id)));
    }

    let token = auth::issue_user_token(&state.config.session_secret, payload.user_id)
        .map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!(target: "audit", user_id = payload.user_id, "issued customer token");
    Ok(Json(TokenResponse {
        user_id: payload.user_id,
        token,
    }))
}
