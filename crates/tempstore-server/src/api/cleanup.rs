use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::storage::{Store, StoreError};

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub status: String,
    /// Age in seconds past which files are removed
    pub retention_secs: u64,
}

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/cleanup", post(trigger_cleanup))
}

/// POST /cleanup - Start an eviction sweep in the background
///
/// Responds as soon as the sweep is queued; it does not wait for it.
async fn trigger_cleanup<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, StoreError> {
    state.service.trigger_cleanup()?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CleanupResponse {
            status: "started".into(),
            retention_secs: state.service.retention().as_secs(),
        }),
    ))
}
