pub mod admin;
pub mod agent;
pub mod chat;
pub mod health;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::send_message))
        .route("/api/chat/:session_id", get(chat::get_session))
        .route("/api/admin/tokens", post(admin::issue_token))
        .route("/api/agent/handoffs", get(agent::list_handoffs))
        .route("/api/agent/handoffs/events", get(agent::events_stream))
        .with_state(state)
}
