//! HTTP API.
//!
//! One store and one completion client are created at startup and shared by
//! every request.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/collections` | List collections |
//! | `PUT`    | `/collections/{name}` | Index the request body as collection `name` |
//! | `DELETE` | `/collections/{name}` | Drop a collection (idempotent) |
//! | `POST`   | `/ask` | Answer a question from a collection |
//!
//! `PUT /collections/{name}` takes the raw document as its body. The document
//! type comes from the `content_type` query parameter, else the request's
//! `Content-Type` header, else sniffing the bytes. `chunk_size` overrides the
//! configured chunk size.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "generation_failed", "message": "...", "retryable": true } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `unprocessable_document` (422), `generation_failed` (502), `internal` (500).
//! `retryable` is only present on `generation_failed`.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::completion::{CompletionService, OpenAiCompatibleClient};
use crate::config::Config;
use crate::error::RagError;
use crate::extract;
use crate::models::{AskOutcome, CollectionInfo, RagParams};
use crate::pipeline;
use crate::store::{IndexStore, SqliteStore};

/// Largest document accepted by `PUT /collections/{name}`.
const MAX_DOCUMENT_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn IndexStore>,
    completion: Arc<dyn CompletionService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn IndexStore>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            completion,
        }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(config).await?);
    let completion = Arc::new(OpenAiCompatibleClient::from_config(&config.completion)?);
    let state = AppState::new(config.clone(), store, completion);

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "HTTP server listening");
    println!("docrag server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/collections", get(handle_list_collections))
        .route(
            "/collections/{name}",
            put(handle_index).delete(handle_drop),
        )
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retryable: Option<bool>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
                retryable: self.retryable,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
        retryable: None,
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
        retryable: None,
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
        retryable: None,
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::InvalidParameter(_) => bad_request(err.to_string()),
            RagError::CollectionNotFound(_) => not_found(err.to_string()),
            RagError::Extraction(_) => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "unprocessable_document",
                message: err.to_string(),
                retryable: None,
            },
            RagError::Generation(ref g) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "generation_failed",
                retryable: Some(g.is_transient()),
                message: err.to_string(),
            },
            RagError::Retrieval(_) | RagError::Indexing(_) => {
                tracing::error!(error = %err, "store failure");
                internal(err.to_string())
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /collections ============

#[derive(Serialize)]
struct CollectionsResponse {
    collections: Vec<CollectionInfo>,
}

async fn handle_list_collections(
    State(state): State<AppState>,
) -> Result<Json<CollectionsResponse>, AppError> {
    let collections = state.store.list().await.map_err(|e| {
        tracing::error!(error = %e, "listing collections failed");
        internal(e.to_string())
    })?;
    Ok(Json(CollectionsResponse { collections }))
}

// ============ PUT /collections/{name} ============

#[derive(Deserialize)]
struct IndexQuery {
    chunk_size: Option<usize>,
    content_type: Option<String>,
}

#[derive(Serialize)]
struct IndexResponse {
    collection: String,
    chunk_count: usize,
}

async fn handle_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<IndexQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IndexResponse>, AppError> {
    if body.is_empty() {
        return Err(bad_request("request body must contain the document"));
    }

    let content_type = query
        .content_type
        .or_else(|| header_content_type(&headers))
        .or_else(|| extract::detect_content_type(None, &body).map(str::to_string))
        .ok_or_else(|| {
            bad_request("could not detect the document type; pass ?content_type=")
        })?;

    let params =
        RagParams::from_config(&state.config).with_overrides(Some(name), query.chunk_size, None, None);
    let chunk_count =
        pipeline::index(state.store.as_ref(), &body, &content_type, &params).await?;

    Ok(Json(IndexResponse {
        collection: params.collection,
        chunk_count,
    }))
}

/// The request's `Content-Type` without parameters, unless it is generic.
fn header_content_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = value.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "" | "application/octet-stream" => None,
        _ => Some(mime),
    }
}

// ============ DELETE /collections/{name} ============

#[derive(Serialize)]
struct DropResponse {
    collection: String,
    /// Whether the collection existed before this request.
    deleted: bool,
}

async fn handle_drop(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DropResponse>, AppError> {
    let store_err = |e: crate::error::StoreError| {
        tracing::error!(error = %e, "dropping collection failed");
        internal(e.to_string())
    };
    let existed = state.store.exists(&name).await.map_err(store_err)?;
    state.store.delete(&name).await.map_err(store_err)?;
    Ok(Json(DropResponse {
        collection: name,
        deleted: existed,
    }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    collection: Option<String>,
    k: Option<usize>,
    model: Option<String>,
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskOutcome>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;

    let params = RagParams::from_config(&state.config).with_overrides(
        request.collection,
        None,
        request.k,
        request.model,
    );
    let outcome = pipeline::ask(
        state.store.as_ref(),
        state.completion.as_ref(),
        &request.question,
        &params,
    )
    .await?;
    Ok(Json(outcome))
}
