use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ConversationTurn, Intent, Outcome};
use crate::services::auth;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub reply: String,
    pub transferred_to_human: bool,
    pub intent: Option<Intent>,
    pub outcome: Outcome,
    pub retryable: bool,
}

// POST /api/chat
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let user_id = auth::authenticate_user(&headers, &state.config.session_secret)
        .ok_or(AppError::Unauthorized)?;

    let session = state.sessions.open(user_id, payload.session_id);
    let reply = state
        .pipeline
        .handle_message(user_id, &payload.message, &session.turns)
        .await;

    // Failed and refused turns stay out of the history fed back to the model.
    let keep_turn = !matches!(reply.outcome, Outcome::Refused | Outcome::Unavailable);
    if keep_turn {
        state.sessions.record_exchange(
            user_id,
            session.id,
            ConversationTurn::user(payload.message.trim()),
            ConversationTurn::assistant(reply.text.clone()),
            reply.transferred_to_human,
        );
    }

    if reply.transferred_to_human {
        state
            .handoffs
            .push(session.id, user_id, payload.message.trim());
    }

    let status = if reply.is_retryable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = ChatResponse {
        session_id: session.id,
        transferred_to_human: reply.transferred_to_human || session.transferred_to_human,
        retryable: reply.is_retryable(),
        intent: reply.intent,
        outcome: reply.outcome,
        reply: reply.text,
    };
    Ok((status, Json(body)).into_response())
}

// GET /api/chat/:session_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = auth::authenticate_user(&headers, &state.config.session_secret)
        .ok_or(AppError::Unauthorized)?;

    let session = state
        .sessions
        .get(user_id, session_id)
        .ok_or_else(|| AppError::NotFound("session".to_string()))?;

    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "transferred_to_human": session.transferred_to_human,
        "turns": session.turns,
    })))
}
