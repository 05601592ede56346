use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::storage::StoreError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            StoreError::NotFound => (StatusCode::NOT_FOUND, "File not found", None),
            StoreError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "Invalid request", Some(msg.clone()))
            }
            StoreError::SizeLimitExceeded { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "File too large",
                Some(format!("maximum file size is {limit} bytes")),
            ),
            StoreError::SweepUnavailable => {
                error!("Cleanup requested but sweep worker is gone");
                (StatusCode::INTERNAL_SERVER_ERROR, "Cleanup unavailable", None)
            }
            StoreError::Io(err) => {
                // Logged here only: I/O details can include server paths
                error!(error = %err, "Storage I/O failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            detail,
        };

        (status, Json(body)).into_response()
    }
}
