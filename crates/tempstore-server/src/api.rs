use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::service::StoreService;
use crate::storage::Store;

mod cleanup;
mod error;
mod files;

pub use error::ErrorResponse;

pub struct AppState<S: Store> {
    pub service: Arc<StoreService<S>>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

pub fn router<S: Store>(service: StoreService<S>) -> Router {
    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .merge(files::router())
        .merge(cleanup::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response, header};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::service::StoreService;
    use crate::storage::MemStore;

    pub const BOUNDARY: &str = "tempstore-test-boundary";

    pub fn app(max_file_size: u64) -> axum::Router {
        let config = Config {
            max_file_size,
            ..Config::default()
        };
        super::router(StoreService::new(MemStore::new(), &config))
    }

    /// Multipart body with a single `file` part.
    pub fn multipart_file(filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    pub fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }
}
