use crate::storage::{ObjectStorage, StorageError};
use axum::{
    Router,
    extract::{
        DefaultBodyLimit, FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use postboard_common::model::ModelValidationError;
use postboard_store::{PostStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

mod form;
mod json;
mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub store: Arc<PostStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// Bodies larger than `max_body_bytes` are rejected with 413.
pub fn app(state: ServerState, max_body_bytes: usize) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Request body could not be read: {0}")]
    BodyRejection(#[from] BytesRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Multipart request rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Multipart body could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error("Image is required")]
    ImageRequired,
    #[error("Error uploading image: {0}")]
    Upload(#[from] StorageError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::Store(
                StoreError::PostNotFound(_) | StoreError::CommentNotFound { .. },
            ) => StatusCode::NOT_FOUND,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::MultipartRejection(_)
            | ServerError::Validation(_)
            | ServerError::ImageRequired => StatusCode::BAD_REQUEST,
            ServerError::BodyRejection(err) => err.status(),
            ServerError::Multipart(err) => err.status(),
            ServerError::JsonResponse(_) | ServerError::Upload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        server::{ServerState, app},
        storage::{ImageUpload, ObjectStorage, StorageError},
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use postboard_common::snowflake::{ProcessId, WorkerId};
    use postboard_store::PostStore;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tower::util::ServiceExt;

    pub(crate) const BOUNDARY: &str = "postboard-test-boundary";
    pub(crate) const MAX_BODY_BYTES: usize = 1024 * 1024;

    /// Keeps uploads in memory and hands out predictable URLs.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryStorage {
        pub(crate) uploads: Mutex<Vec<ImageUpload>>,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn store_image(&self, image: ImageUpload) -> Result<String, StorageError> {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(image);
            Ok(format!("https://cdn.example/{}", uploads.len()))
        }
    }

    #[derive(Debug)]
    pub(crate) struct FailingStorage;

    #[async_trait]
    impl ObjectStorage for FailingStorage {
        async fn store_image(&self, _image: ImageUpload) -> Result<String, StorageError> {
            Err(StorageError::MissingLocation)
        }
    }

    pub(crate) fn test_app(storage: Arc<dyn ObjectStorage>) -> (Router, Arc<PostStore>) {
        limited_app(storage, MAX_BODY_BYTES)
    }

    pub(crate) fn limited_app(
        storage: Arc<dyn ObjectStorage>,
        max_body_bytes: usize,
    ) -> (Router, Arc<PostStore>) {
        let store = Arc::new(PostStore::new(WorkerId::default(), ProcessId::default()));
        let state = ServerState {
            store: store.clone(),
            storage,
        };

        (app(state, max_body_bytes), store)
    }

    pub(crate) fn memory_app() -> (Router, Arc<PostStore>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        let (app, store) = test_app(storage.clone());

        (app, store, storage)
    }

    pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    pub(crate) fn empty(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    pub(crate) fn json(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// A `multipart/form-data` request with text fields and an optional `image` file.
    pub(crate) fn multipart(
        method: &str,
        uri: &str,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
                    filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_route() {
        let (app, _, _) = memory_app();

        let (status, body) = send(&app, empty("GET", "/nowhere")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
        assert!(body["message"].as_str().unwrap().contains("/nowhere"));
    }
}
