//! HTTP API: `GET /`, `POST /save_memory`, `POST /search_memory`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::{Error, ErrorKind};
use crate::memory::MemoryService;
use crate::memory_types::Metadata;

const WELCOME_MESSAGE: &str = "Welcome to the Memoria API!";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MemoryService>,
}

#[derive(Debug, Deserialize)]
pub struct SaveMemoryRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveMemoryResponse {
    pub status: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchMemoryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchMemoryResponse {
    pub status: String,
    pub results: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    pub kind: String,
}

/// A failed request: status code plus `{detail, kind}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: ErrorKind,
    detail: String,
}

impl ApiError {
    /// Log a failed operation and turn it into a response.
    fn from_error(operation: &'static str, err: Error) -> Self {
        let kind = err.kind();
        let status = if err.is_bad_input() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(operation, kind = %kind, error = %err, "Request failed");
        Self {
            status,
            kind,
            detail: err.to_string(),
        }
    }

    fn from_rejection(operation: &'static str, rejection: JsonRejection) -> Self {
        warn!(operation, error = %rejection.body_text(), "Malformed request body");
        Self {
            status: rejection.status(),
            kind: ErrorKind::Validation,
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail,
            kind: self.kind.as_str().to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: WELCOME_MESSAGE.to_string(),
    })
}

async fn save_memory(
    State(state): State<AppState>,
    payload: Result<Json<SaveMemoryRequest>, JsonRejection>,
) -> Result<Json<SaveMemoryResponse>, ApiError> {
    let Json(request) = payload.map_err(|r| ApiError::from_rejection("save_memory", r))?;

    let id = state
        .service
        .save_with_metadata(&request.content, request.metadata)
        .await
        .map_err(|e| ApiError::from_error("save_memory", e))?;

    Ok(Json(SaveMemoryResponse {
        status: "success".to_string(),
        id: id.to_string(),
    }))
}

async fn search_memory(
    State(state): State<AppState>,
    payload: Result<Json<SearchMemoryRequest>, JsonRejection>,
) -> Result<Json<SearchMemoryResponse>, ApiError> {
    let Json(request) = payload.map_err(|r| ApiError::from_rejection("search_memory", r))?;

    let results = state
        .service
        .search(&request.query)
        .await
        .map_err(|e| ApiError::from_error("search_memory", e))?;

    Ok(Json(SearchMemoryResponse {
        status: "success".to_string(),
        results,
    }))
}

/// Whether `origin` matches one of the allowed patterns.
///
/// A pattern ending in `*` matches any origin starting with the rest of the pattern;
/// anything else must match exactly.
pub fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => origin.starts_with(prefix),
        None => pattern == origin,
    })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let patterns = allowed_origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| {
                origin
                    .to_str()
                    .map(|origin| origin_allowed(&patterns, origin))
                    .unwrap_or(false)
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

/// Build the application router.
pub fn build_router(service: Arc<MemoryService>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/save_memory", post(save_memory))
        .route("/search_memory", post(search_memory))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Serve the API until a shutdown signal arrives.
pub async fn serve(service: Arc<MemoryService>, server: &ServerConfig) -> Result<(), Error> {
    let app = build_router(service, &server.allowed_origins);

    let listener = tokio::net::TcpListener::bind(server.bind_address).await?;
    info!(
        address = %listener.local_addr()?,
        origins = ?server.allowed_origins,
        "Memoria API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::keyword_service;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_router(top_k: usize) -> (Router, TempDir) {
        let (service, _, dir) = keyword_service(top_k);
        let origins = vec!["chrome-extension://*".to_string()];
        (build_router(Arc::new(service), &origins), dir)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_origin_patterns() {
        let patterns = vec![
            "chrome-extension://*".to_string(),
            "https://app.example.com".to_string(),
        ];
        assert!(origin_allowed(&patterns, "chrome-extension://abcdef"));
        assert!(origin_allowed(&patterns, "https://app.example.com"));
        assert!(!origin_allowed(&patterns, "https://app.example.com.evil.test"));
        assert!(!origin_allowed(&patterns, "https://evil.test"));
        assert!(origin_allowed(&["*".to_string()], "https://anything.test"));
        assert!(!origin_allowed(&[], "chrome-extension://abcdef"));
    }

    #[tokio::test]
    async fn test_root() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: StatusResponse = body_json(response).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.message, "Welcome to the Memoria API!");
    }

    #[tokio::test]
    async fn test_save_then_search() {
        let (app, _dir) = test_router(5);

        let response = app
            .clone()
            .oneshot(post_json(
                "/save_memory",
                serde_json::json!({ "content": "the cat sleeps on the sofa" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved: SaveMemoryResponse = body_json(response).await;
        assert_eq!(saved.status, "success");
        assert!(saved.id.parse::<crate::memory_types::MemoryId>().is_ok());

        app.clone()
            .oneshot(post_json(
                "/save_memory",
                serde_json::json!({ "content": "dog park on saturday" }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/search_memory",
                serde_json::json!({ "query": "where does the cat sleep" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let found: SearchMemoryResponse = body_json(response).await;
        assert_eq!(found.status, "success");
        assert_eq!(found.results[0], "the cat sleeps on the sofa");
        assert_eq!(found.results.len(), 2);
    }

    #[tokio::test]
    async fn test_save_with_metadata() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(post_json(
                "/save_memory",
                serde_json::json!({ "content": "car service due", "metadata": { "source": "popup" } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_search_bounded_by_top_k() {
        let (app, _dir) = test_router(2);
        for content in ["cat a", "cat b", "cat c"] {
            app.clone()
                .oneshot(post_json(
                    "/save_memory",
                    serde_json::json!({ "content": content }),
                ))
                .await
                .unwrap();
        }

        let response = app
            .oneshot(post_json("/search_memory", serde_json::json!({ "query": "cat" })))
            .await
            .unwrap();
        let found: SearchMemoryResponse = body_json(response).await;
        assert_eq!(found.results.len(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(post_json("/search_memory", serde_json::json!({ "query": "cat" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let found: SearchMemoryResponse = body_json(response).await;
        assert!(found.results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_is_validation_error() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(post_json("/save_memory", serde_json::json!({ "content": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.kind, "validation");
        assert!(!body.detail.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_validation_error() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(post_json("/search_memory", serde_json::json!({ "query": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.kind, "validation");
    }

    #[tokio::test]
    async fn test_missing_field_rejected_with_error_body() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(post_json("/save_memory", serde_json::json!({ "text": "wrong key" })))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.kind, "validation");
    }

    #[tokio::test]
    async fn test_cors_allows_extension_origin() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "chrome-extension://abcdefghijklmnop")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "chrome-extension://abcdefghijklmnop"
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_other_origin() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "https://evil.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (app, _dir) = test_router(5);
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/save_memory")
                    .header("origin", "chrome-extension://abc")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "chrome-extension://abc"
        );
    }
}
