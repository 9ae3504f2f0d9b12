use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::services::auth;
use crate::services::handoff::HandoffEvent;
use crate::state::AppState;

// GET /api/agent/handoffs
pub async fn list_handoffs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<HandoffEvent>>, AppError> {
    if !auth::is_admin(&headers, &state.config.admin_token) {
        return Err(AppError::Unauthorized);
    }
    Ok(Json(state.handoffs.pending()))
}

#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
}

// GET /api/agent/handoffs/events (SSE)
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Auth via query param (EventSource can't set headers)
    let token = query.token.as_deref().unwrap_or("");
    if state.config.admin_token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let rx = state.handoffs.subscribe();

    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event("handoff")))
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive_stream = tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(
        Duration::from_secs(30),
    ))
    .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    Ok(Sse::new(live_stream.merge(keepalive_stream)))
}
