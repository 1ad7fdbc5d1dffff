//! HTTP adapter over [`SearchEngine`].
//!
//! Routes:
//! - `GET /` service description
//! - `POST /search` with `{"query": "...", "top_k": 5}`
//! - `GET /document/{doc_id}`
//!
//! Engine calls run on the blocking pool so request handling never stalls
//! the async runtime.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::error::SearchError;
use crate::search::{SearchEngine, SearchResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub default_top_k: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub doc_id: String,
    pub text: String,
}

/// Error body: `{"detail": "...", "code": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            detail: detail.to_string(),
        }
    }

    fn not_found(detail: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            detail,
        }
    }

    fn internal(detail: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL",
            detail,
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let status = match err {
            SearchError::IndexNotBuilt => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.status_code(),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail, "code": self.code });
        (self.status, Json(body)).into_response()
    }
}

/// Builds the router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/search", post(search))
        .route("/document/{doc_id}", get(document))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "docsense",
        "version": env!("CARGO_PKG_VERSION"),
        "state": state.engine.state(),
        "documents": state.engine.document_count(),
        "endpoints": {
            "search": "POST /search",
            "document": "GET /document/{doc_id}",
        },
    }))
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty"));
    }

    let top_k = request.top_k.unwrap_or(state.default_top_k);
    let engine = Arc::clone(&state.engine);
    let results = tokio::task::spawn_blocking(move || engine.search(&request.query, top_k))
        .await
        .map_err(|e| ApiError::internal(format!("search task failed: {e}")))??;

    Ok(Json(SearchResponse { results }))
}

async fn document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    match state.engine.get_document(&doc_id)? {
        Some(text) => Ok(Json(DocumentResponse { doc_id, text })),
        None => Err(ApiError::not_found(format!("Document '{doc_id}' not found"))),
    }
}

/// Builds the index from `docs_dir`, then serves until Ctrl+C.
///
/// A failed startup build is logged and the server keeps running; search
/// and document requests answer 503 until an index exists.
pub async fn serve_http(
    engine: Arc<SearchEngine>,
    docs_dir: PathBuf,
    bind: String,
    default_top_k: usize,
) -> anyhow::Result<()> {
    let builder = Arc::clone(&engine);
    let build_dir = docs_dir.clone();
    match tokio::task::spawn_blocking(move || builder.build_from_dir(&build_dir)).await? {
        Ok(report) => info!(
            "Startup index ready: {} documents from {}",
            report.documents,
            docs_dir.display()
        ),
        Err(e) => error!("Startup index build failed for {}: {e}", docs_dir.display()),
    }

    let app = router(AppState {
        engine,
        default_top_k,
    });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    eprintln!("docsense listening on http://{bind}");
    eprintln!("Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("HTTP server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
}
