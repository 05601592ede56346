//! File handlers:
//! - POST /upload - multipart upload (field `file`)
//! - GET /files - list stored files
//! - GET /file-info/:name - metadata for one file
//! - GET /files/:name - file content, disposition by content type
//! - GET /download/:name - file content, always as an attachment
//! - DELETE /files/:name - remove a file

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::api::AppState;
use crate::content_type::Disposition;
use crate::service::{Download, FileInfo};
use crate::storage::{Store, StoreError};

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Response for a completed upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub file: FileInfo,
    pub saved_successfully: bool,
}

/// Response for a deletion.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub filename: String,
    pub deleted: bool,
}

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        // The ceiling is enforced while streaming, not by buffering the body
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/files", get(list_files))
        .route("/files/{name}", get(get_file).delete(delete_file))
        .route("/file-info/{name}", get(file_info))
        .route("/download/{name}", get(download_file))
}

/// POST /upload - Store the `file` part of a multipart body
async fn upload_file<S: Store>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, StoreError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StoreError::Validation(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let filename = field.file_name().map(str::to_owned);
        let declared_size = field
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let stream = field.map_err(std::io::Error::other);
        let mut reader = StreamReader::new(Box::pin(stream));

        let file = state
            .service
            .upload(
                filename.as_deref().filter(|n| !n.is_empty()),
                &mut reader,
                declared_size,
            )
            .await?;

        return Ok(Json(UploadResponse {
            file,
            saved_successfully: true,
        }));
    }

    Err(StoreError::Validation("no file selected".into()))
}

/// GET /files - List all stored files, sorted by name
async fn list_files<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<FileInfo>>, StoreError> {
    Ok(Json(state.service.list().await?))
}

/// GET /file-info/:name - Metadata for one file
async fn file_info<S: Store>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Json<FileInfo>, StoreError> {
    Ok(Json(state.service.info(&name).await?))
}

/// GET /files/:name - Stream file content
async fn get_file<S: Store>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Response, StoreError> {
    let download = state.service.fetch(&name).await?;
    let disposition = download.disposition;
    Ok(file_response(download, disposition))
}

/// GET /download/:name - Stream file content as an attachment
async fn download_file<S: Store>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Response, StoreError> {
    let download = state.service.fetch(&name).await?;
    Ok(file_response(download, Disposition::Attachment))
}

/// DELETE /files/:name - Remove a file
async fn delete_file<S: Store>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>, StoreError> {
    state.service.delete(&name).await?;
    Ok(Json(DeleteResponse {
        filename: name,
        deleted: true,
    }))
}

fn file_response(download: Download, disposition: Disposition) -> Response {
    let Download { info, body, .. } = download;
    (
        [
            (header::CONTENT_TYPE, info.content_type),
            (header::CONTENT_LENGTH, info.file_size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                disposition.header_value(&info.filename),
            ),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
