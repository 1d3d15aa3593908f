//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest` | Multipart upload of `.pdf` / `.txt` files |
//! | `POST` | `/extract?document_id=` | Heuristic contract fields |
//! | `POST` | `/ask` | Answer with citations, body `{"question": "..."}` |
//! | `GET`  | `/ask/stream?q=` | Server-sent events, one word per frame |
//! | `GET`  | `/search?q=&limit=` | Ranked sentences |
//! | `POST` | `/audit?document_id=` | Risk findings |
//! | `GET`  | `/healthz` | Health check (returns version) |
//! | `GET`  | `/metrics` | Request counters |
//! | `POST` | `/webhook/events` | Acknowledge an event payload |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # Streaming
//!
//! `/ask/stream` sends each answer word as its own `data:` frame and finishes
//! with `{"citation": {"document_id", "page"}}`. When nothing matches a
//! single informational frame is sent instead. If the client disconnects the
//! response body is dropped, which cancels the presenter.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::answer::answer;
use crate::config::Config;
use crate::error::CiteError;
use crate::extract::{is_supported, ExtractError};
use crate::index::IndexHandle;
use crate::ingest::{ingest_uploads, open_index, Upload};
use crate::models::{Answer, SearchHitItem};
use crate::retrieve::retrieve;
use crate::rules::{audit, extract_fields, AuditFinding, ContractFields};
use crate::store;
use crate::stream::{cancel_pair, AnswerPresenter};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    index: Arc<IndexHandle>,
    metrics: Arc<Metrics>,
}

/// Starts the HTTP server.
///
/// Opens the store, builds the index over every stored document, and binds
/// to `[server].bind`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let (pool, index) = open_index(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        index: Arc::new(index),
        metrics: Arc::new(Metrics::default()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/extract", post(handle_extract))
        .route("/ask", post(handle_ask))
        .route("/ask/stream", get(handle_ask_stream))
        .route("/search", get(handle_search))
        .route("/audit", post(handle_audit))
        .route("/healthz", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/webhook/events", post(handle_webhook))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "server listening");
    println!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Metrics ============

#[derive(Default)]
struct Metrics {
    ingest: AtomicU64,
    extract: AtomicU64,
    ask: AtomicU64,
    audit: AtomicU64,
}

#[derive(Serialize)]
struct MetricsResponse {
    ingest_count: u64,
    extract_count: u64,
    ask_count: u64,
    audit_count: u64,
}

impl Metrics {
    fn snapshot(&self) -> MetricsResponse {
        MetricsResponse {
            ingest_count: self.ingest.load(Ordering::Relaxed),
            extract_count: self.extract.load(Ordering::Relaxed),
            ask_count: self.ask.load(Ordering::Relaxed),
            audit_count: self.audit.load(Ordering::Relaxed),
        }
    }
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
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error. The cause is logged, not returned.
fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: "internal error".to_string(),
    }
}

impl From<CiteError> for AppError {
    fn from(err: CiteError) -> Self {
        if err.is_user_error() {
            bad_request(err.to_string())
        } else {
            internal(err.into())
        }
    }
}

/// Malformed or non-JSON request bodies.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

/// Extraction failures are the uploader's fault; anything else is ours.
fn classify_ingest_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<ExtractError>() {
        Some(e) => bad_request(e.to_string()),
        None => internal(err),
    }
}

// ============ POST /ingest ============

#[derive(Serialize)]
struct IngestResponse {
    document_ids: Vec<i64>,
}

async fn handle_ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if !is_supported(&filename) {
            return Err(bad_request(
                ExtractError::UnsupportedFileType(filename).to_string(),
            ));
        }
        let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
        uploads.push(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    if uploads.is_empty() {
        return Err(bad_request("no files uploaded"));
    }

    let ids = ingest_uploads(&state.pool, &state.index, uploads)
        .await
        .map_err(classify_ingest_error)?;
    state
        .metrics
        .ingest
        .fetch_add(ids.len() as u64, Ordering::Relaxed);

    Ok(Json(IngestResponse { document_ids: ids }))
}

// ============ POST /extract, POST /audit ============

#[derive(Deserialize)]
struct DocumentQuery {
    document_id: i64,
}

async fn load_pages(state: &AppState, document_id: i64) -> Result<Vec<String>, AppError> {
    store::get_pages(&state.pool, document_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Document not found"))
}

async fn handle_extract(
    State(state): State<AppState>,
    Query(params): Query<DocumentQuery>,
) -> Result<Json<ContractFields>, AppError> {
    let pages = load_pages(&state, params.document_id).await?;
    let fields = extract_fields(&pages);
    state.metrics.extract.fetch_add(1, Ordering::Relaxed);
    Ok(Json(fields))
}

async fn handle_audit(
    State(state): State<AppState>,
    Query(params): Query<DocumentQuery>,
) -> Result<Json<Vec<AuditFinding>>, AppError> {
    let pages = load_pages(&state, params.document_id).await?;
    let findings = audit(&pages);
    state.metrics.audit.fetch_add(1, Ordering::Relaxed);
    Ok(Json(findings))
}

// ============ POST /ask ============

/// Accepts `question` or its short alias `q`.
#[derive(Deserialize)]
struct AskRequest {
    question: Option<String>,
    q: Option<String>,
}

async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let Json(req) = body?;
    let question = req
        .question
        .filter(|s| !s.trim().is_empty())
        .or(req.q)
        .unwrap_or_default();
    if question.trim().is_empty() {
        return Err(bad_request("Provide a 'question' field"));
    }

    let index = state.index.snapshot();
    let result = answer(&index, &question, state.config.retrieval.top_k)?;
    state.metrics.ask.fetch_add(1, Ordering::Relaxed);
    Ok(Json(result))
}

// ============ GET /ask/stream ============

#[derive(Deserialize)]
struct StreamQuery {
    #[serde(default)]
    q: String,
}

async fn handle_ask_stream(
    State(state): State<AppState>,
    Query(params): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let index = state.index.snapshot();
    let result = answer(&index, &params.q, state.config.retrieval.stream_top_k)?;

    let (handle, signal) = cancel_pair();
    let guard = handle.drop_guard();
    let presenter = AnswerPresenter::new(&result, state.config.stream.pacing(), signal);

    // The guard lives as long as the body; dropping the body cancels.
    let events = presenter.into_stream().map(move |event| {
        let _keep = &guard;
        Ok(Event::default().data(event.frame_data()))
    });
    Ok(Sse::new(events))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHitItem>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    if params.q.trim().is_empty() {
        return Err(CiteError::EmptyQuery.into());
    }
    let limit = params.limit.unwrap_or(state.config.retrieval.top_k).max(1);
    let index = state.index.snapshot();
    let results = retrieve(&index, &params.q, limit)
        .iter()
        .map(SearchHitItem::from)
        .collect();
    Ok(Json(SearchResponse { results }))
}

// ============ Admin ============

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

async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.metrics.snapshot())
}

#[derive(Serialize)]
struct WebhookResponse {
    status: String,
    payload_size: usize,
}

async fn handle_webhook(
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<WebhookResponse>, AppError> {
    let Json(payload) = body?;
    let payload_size = serde_json::to_string(&payload).map(|s| s.len()).unwrap_or(0);
    tracing::debug!(payload_size, "webhook event received");
    Ok(Json(WebhookResponse {
        status: "received".to_string(),
        payload_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Citation;

    #[test]
    fn test_empty_query_maps_to_bad_request() {
        let err = AppError::from(CiteError::EmptyQuery);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
        assert_eq!(err.message, "query must not be empty");
    }

    #[test]
    fn test_out_of_bounds_maps_to_internal() {
        let err = AppError::from(CiteError::CitationOutOfBounds {
            document_id: 1,
            page_index: 0,
            char_start: 0,
            char_end: 4,
            span_start: 2,
            span_end: 9,
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "internal");
    }

    #[tokio::test]
    async fn test_json_rejection_maps_to_bad_request() {
        use axum::extract::FromRequest;

        let req = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let rejection = Json::<AskRequest>::from_request(req, &()).await.err().unwrap();
        let err = AppError::from(rejection);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[test]
    fn test_extract_error_maps_to_bad_request() {
        let err = classify_ingest_error(ExtractError::InvalidUtf8.into());
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = classify_ingest_error(anyhow::anyhow!("disk full"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_answer_serializes_wire_shape() {
        let a = Answer {
            answer: "15 days notice".into(),
            citations: vec![Citation {
                document_id: 1,
                page: 0,
                start_char: 4,
                end_char: 18,
                text: "15 days notice".into(),
            }],
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["answer"], "15 days notice");
        assert_eq!(v["citations"][0]["start_char"], 4);
        assert_eq!(v["citations"][0]["end_char"], 18);
    }
}
