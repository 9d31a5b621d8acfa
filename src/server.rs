//! HTTP adapter for browsing, reading, and downloading bills.
//!
//! Every client works inside its own session, so uploads and catalogs of one
//! browser tab never leak into another. Filesystem and extraction work runs on
//! the blocking thread pool. Sessions idle for longer than
//! `[server].session_ttl_secs` are dropped, together with their uploads,
//! whenever a session is created or looked up.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/sessions` | Create a session |
//! | `DELETE` | `/sessions/{id}` | End a session and drop its uploads |
//! | `GET`    | `/sessions/{id}/documents` | Current catalog |
//! | `POST`   | `/sessions/{id}/refresh` | Re-resolve the source and relist |
//! | `POST`   | `/sessions/{id}/uploads` | Supply PDFs when no folder exists |
//! | `GET`    | `/sessions/{id}/documents/{name}/pages` | Per-page text |
//! | `GET`    | `/sessions/{id}/documents/{name}/download` | Raw PDF bytes |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "..." } }
//! ```
//!
//! Codes come from [`BillError::code`]; the message is the user-facing text.

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::BillError;
use crate::extract::{CancelFlag, ContentExtractor};
use crate::models::{DocumentEntry, ExtractedDocument, SourceLocation};
use crate::progress::NoProgress;
use crate::session::Session;
use crate::upload::UploadedFile;

/// Request bodies carry base64 PDFs, so allow more than axum's 2 MB default.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

type SessionHandle = Arc<Mutex<Session>>;

struct SessionSlot {
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    extractor: Arc<ContentExtractor>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionSlot>>>,
    session_ttl: TimeDelta,
}

impl AppState {
    fn new(config: &Config) -> Self {
        let session_ttl = i64::try_from(config.server.session_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        AppState {
            config: Arc::new(config.clone()),
            extractor: Arc::new(ContentExtractor::from_config(&config.extract)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl,
        }
    }

    fn create_session(&self) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| internal("session registry poisoned"))?;
        self.sweep_expired(&mut sessions, now);
        sessions.insert(
            id,
            SessionSlot {
                handle: Arc::new(Mutex::new(Session::from_config(&self.config))),
                last_seen: now,
            },
        );
        Ok(id)
    }

    fn session(&self, id: &str) -> Result<SessionHandle, AppError> {
        let uuid = Uuid::parse_str(id).map_err(|_| unknown_session(id))?;
        let now = Utc::now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| internal("session registry poisoned"))?;
        self.sweep_expired(&mut sessions, now);
        let slot = sessions.get_mut(&uuid).ok_or_else(|| unknown_session(id))?;
        slot.last_seen = now;
        Ok(Arc::clone(&slot.handle))
    }

    /// Drops sessions not seen within the TTL. Their upload directories go
    /// away once no in-flight request holds the session any more.
    fn sweep_expired(&self, sessions: &mut HashMap<Uuid, SessionSlot>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let keep = now.signed_duration_since(slot.last_seen) <= self.session_ttl;
            if !keep {
                tracing::debug!(%id, "session expired");
            }
            keep
        });
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, remaining = sessions.len(), "swept idle sessions");
        }
    }
}

/// Builds the router. Exposed for tests and embedding.
pub fn router(config: &Config) -> Router {
    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sessions", post(handle_create_session))
        .route("/sessions/{id}", delete(handle_end_session))
        .route("/sessions/{id}/documents", get(handle_documents))
        .route("/sessions/{id}/refresh", post(handle_refresh))
        .route("/sessions/{id}/uploads", post(handle_upload))
        .route("/sessions/{id}/documents/{name}/pages", get(handle_pages))
        .route(
            "/sessions/{id}/documents/{name}/download",
            get(handle_download),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "bill viewer listening");
    println!("bill viewer listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

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

impl From<BillError> for AppError {
    fn from(err: BillError) -> Self {
        let status = match &err {
            BillError::SourceNotFound => StatusCode::CONFLICT,
            BillError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BillError::DocumentOpenFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BillError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillError::InvalidUpload { .. } => StatusCode::BAD_REQUEST,
            // Only reachable when the client has already gone away.
            BillError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        };
        tracing::debug!(error = %err, "request failed");
        AppError {
            status,
            code: err.code().to_string(),
            message: err.user_message(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unknown_session(id: &str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "unknown_session".to_string(),
        message: format!("no session with id {}", id),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Runs `f` on the session under its lock, on the blocking pool.
async fn with_session<T, F>(state: &AppState, id: &str, f: F) -> Result<T, AppError>
where
    F: FnOnce(&mut Session) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let session = state.session(id)?;
    tokio::task::spawn_blocking(move || {
        let mut guard = session
            .lock()
            .map_err(|_| internal("session state poisoned"))?;
        f(&mut guard).map_err(AppError::from)
    })
    .await
    .map_err(|e| internal(e.to_string()))?
}

/// Cancels an extraction when the request future is dropped.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
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

// ============ Sessions ============

#[derive(Serialize)]
struct SessionResponse {
    id: String,
}

async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let id = state.create_session()?;
    tracing::debug!(%id, "session created");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse { id: id.to_string() }),
    ))
}

async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = Uuid::parse_str(&id).map_err(|_| unknown_session(&id))?;
    let removed = state
        .sessions
        .write()
        .map_err(|_| internal("session registry poisoned"))?
        .remove(&uuid);
    match removed {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(unknown_session(&id)),
    }
}

// ============ Catalog ============

#[derive(Serialize)]
struct CatalogResponse {
    source_kind: &'static str,
    /// Folder path; omitted for uploads, whose storage is private.
    source_path: Option<String>,
    documents: Vec<DocumentEntry>,
    notice: Option<&'static str>,
}

impl From<&Catalog> for CatalogResponse {
    fn from(catalog: &Catalog) -> Self {
        let source_path = match catalog.source() {
            SourceLocation::Directory { path, .. } => Some(path.display().to_string()),
            SourceLocation::Ephemeral(_) => None,
        };
        CatalogResponse {
            source_kind: catalog.source().kind().as_str(),
            source_path,
            documents: catalog.entries().to_vec(),
            notice: catalog.notice(),
        }
    }
}

async fn handle_documents(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogResponse>, AppError> {
    let catalog = with_session(&state, &id, |s| s.open()).await?;
    Ok(Json(CatalogResponse::from(catalog.as_ref())))
}

async fn handle_refresh(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogResponse>, AppError> {
    let catalog = with_session(&state, &id, |s| s.refresh()).await?;
    Ok(Json(CatalogResponse::from(catalog.as_ref())))
}

#[derive(Deserialize)]
struct UploadRequest {
    files: Vec<UploadFileBody>,
}

#[derive(Deserialize)]
struct UploadFileBody {
    name: String,
    content_base64: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<CatalogResponse>, AppError> {
    let files = request
        .files
        .into_iter()
        .map(|f| {
            base64::engine::general_purpose::STANDARD
                .decode(f.content_base64.as_bytes())
                .map(|bytes| UploadedFile::new(f.name.clone(), bytes))
                .map_err(|e| bad_request(format!("{}: invalid base64 content: {}", f.name, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let catalog = with_session(&state, &id, move |s| s.supply_upload(&files)).await?;
    Ok(Json(CatalogResponse::from(catalog.as_ref())))
}

// ============ Documents ============

async fn handle_pages(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ExtractedDocument>, AppError> {
    let entry = with_session(&state, &id, move |s| {
        s.open()?;
        s.select(&name)
    })
    .await?;

    let guard = CancelOnDrop(CancelFlag::new());
    let cancel = guard.0.clone();
    let extractor = Arc::clone(&state.extractor);
    let doc = tokio::task::spawn_blocking(move || {
        extractor.extract_with(&entry, &cancel, &NoProgress)
    })
    .await
    .map_err(|e| internal(e.to_string()))??;
    drop(guard);

    Ok(Json(doc))
}

async fn handle_download(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let download = with_session(&state, &id, move |s| {
        s.open()?;
        s.download(&name)
    })
    .await?;

    let disposition = HeaderValue::from_str(&content_disposition(&download.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let etag = HeaderValue::from_str(&format!("\"{}\"", download.sha256()))
        .map_err(|e| internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(download.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::ETAG, etag),
        ],
        download.bytes,
    )
        .into_response())
}

/// `attachment` header carrying an ASCII `filename` fallback plus the exact
/// name as RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}
