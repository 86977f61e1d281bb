use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::ordering::OrderingError;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Missing or malformed caller input; nothing was sent to the store.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("queue store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

impl QueueError {
    pub fn entry_not_found(id: &str) -> Self {
        QueueError::NotFound(format!("entry '{id}'"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            QueueError::Validation(_) => StatusCode::BAD_REQUEST,
            QueueError::NotFound(_) => StatusCode::NOT_FOUND,
            QueueError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<OrderingError> for QueueError {
    fn from(err: OrderingError) -> Self {
        match err {
            OrderingError::UnknownEntry(id) => QueueError::entry_not_found(&id),
            other => QueueError::Validation(other.to_string()),
        }
    }
}
