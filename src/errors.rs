use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Read failures from the order store. Never carries row data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Unavailable(format!("{e:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("input rejected: {reason}")]
pub struct SanitizationRejected {
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("access denied for user {user_id} on order {order_id}")]
pub struct AccessDenied {
    pub user_id: i64,
    pub order_id: i64,
}

/// Failures inside one message cycle. None of these reach the customer
/// verbatim; the pipeline turns each one into a fixed reply.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("classifier output did not match a label: {0:?}")]
    ClassificationParse(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error("unknown user {0}")]
    UnknownUser(i64),

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    #[error(transparent)]
    SanitizationRejected(#[from] SanitizationRejected),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::StoreUnavailable(_) | PipelineError::ModelUnavailable(_)
        )
    }
}
