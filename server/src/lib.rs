pub mod report;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rag_core::loader::{is_supported, load_dir};
use rag_core::{Engine, EngineConfig, EngineError};
use report::{Report, ReportFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const SUPPORTED_FORMATS: &[&str] = &[".txt", ".pdf", ".md", ".docx"];
const HISTORY_PAGE: usize = 20;
/// Fixed confidence reported with every answer.
pub const ANSWER_CONFIDENCE: f64 = 0.9;

type ApiError = (StatusCode, String);

pub struct ServerOptions {
    pub data_dir: PathBuf,
    pub engine: EngineConfig,
    /// When set, mutating endpoints require a matching `X-ADMIN-TOKEN` header.
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub data_dir: PathBuf,
    pub started_at: Instant,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub document_filter: Option<String>,
}
fn default_top_k() -> usize { 3 }

#[derive(Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub query_time: f64,
    pub total_documents_searched: usize,
    pub document_specific_answers: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct DownloadRequest {
    pub query: String,
    pub format: String,
    #[serde(default = "default_true")]
    pub include_sources: bool,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}
fn default_true() -> bool { true }

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub documents_loaded: bool,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub indexed_terms: usize,
    pub cache_entries: usize,
    pub system_uptime: String,
    pub supported_formats: &'static [&'static str],
}

#[derive(Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub upload_date: Option<String>,
}

pub fn build_app(options: ServerOptions) -> Result<Router> {
    let engine = Arc::new(Engine::new(options.engine)?);
    engine.load_corpus(load_dir(&options.data_dir));
    let state = AppState {
        engine,
        data_dir: options.data_dir,
        started_at: Instant::now(),
        admin_token: options.admin_token,
    };
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .route("/documents", get(list_documents))
        .route("/documents/:filename", put(upload_document).delete(delete_document))
        .route("/rebuild-index", post(rebuild_index))
        .route("/query-history", get(query_history))
        .route("/system-stats", get(system_stats))
        .route("/download-answer", post(download_answer))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn engine_error(err: EngineError) -> ApiError {
    let status = match err {
        EngineError::InvalidTopK => StatusCode::BAD_REQUEST,
        EngineError::NoDocuments | EngineError::Config(_) | EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn uptime(started_at: Instant) -> String {
    let secs = started_at.elapsed().as_secs();
    format!("{}d {}h {}m", secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60)
}

fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Reload the data directory into the engine on the blocking pool.
async fn reload(state: &AppState) -> Result<usize, ApiError> {
    let engine = state.engine.clone();
    let dir = state.data_dir.clone();
    tokio::task::spawn_blocking(move || {
        engine.load_corpus(load_dir(&dir));
        engine.stats().documents
    })
    .await
    .map_err(internal)
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.engine.stats();
    Json(HealthResponse {
        status: "healthy",
        documents_loaded: stats.documents > 0,
        total_documents: stats.documents,
        total_chunks: stats.chunks,
        indexed_terms: stats.terms,
        cache_entries: stats.cache_entries,
        system_uptime: uptime(state.started_at),
        supported_formats: SUPPORTED_FORMATS,
    })
}

pub async fn query_handler(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Result<Json<QueryResponse>, ApiError> {
    let outcome = state
        .engine
        .search(&req.query, req.top_k, req.document_filter.as_deref())
        .map_err(|e| {
            tracing::error!(error = %e, "error processing query");
            engine_error(e)
        })?;
    Ok(Json(QueryResponse {
        answer: outcome.answer.clone(),
        sources: outcome.sources.clone(),
        confidence: ANSWER_CONFIDENCE,
        query_time: outcome.elapsed_seconds(),
        total_documents_searched: outcome.documents_searched,
        document_specific_answers: outcome.document_answers.clone(),
    }))
}

pub async fn list_documents(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let mut documents = Vec::new();
    if state.data_dir.is_dir() {
        for entry in std::fs::read_dir(&state.data_dir).map_err(internal)? {
            let entry = entry.map_err(internal)?;
            let filename = entry.file_name().to_string_lossy().to_string();
            if !is_supported(&filename) {
                continue;
            }
            let meta = entry.metadata().map_err(internal)?;
            let upload_date = meta
                .created()
                .or_else(|_| meta.modified())
                .ok()
                .and_then(|t| OffsetDateTime::from(t).format(&Rfc3339).ok());
            documents.push(DocumentInfo { filename, size_bytes: meta.len(), size_mb: size_mb(meta.len()), upload_date });
        }
    }
    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(Json(serde_json::json!({ "documents": documents })))
}

fn valid_filename(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\']) && is_supported(name)
}

async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    if !valid_filename(&filename) {
        return Err((StatusCode::BAD_REQUEST, format!("Unsupported file name '{filename}'")));
    }
    std::fs::create_dir_all(&state.data_dir).map_err(internal)?;
    std::fs::write(state.data_dir.join(&filename), &body).map_err(internal)?;
    let documents = reload(&state).await?;
    tracing::info!(%filename, bytes = body.len(), "document uploaded");
    Ok(Json(serde_json::json!({
        "message": format!("Document '{filename}' uploaded successfully"),
        "filename": filename,
        "file_size_mb": size_mb(body.len() as u64),
        "documents_loaded": documents,
        "supported_formats": SUPPORTED_FORMATS,
    })))
}

async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let path = state.data_dir.join(&filename);
    if !valid_filename(&filename) || !path.is_file() {
        return Err((StatusCode::NOT_FOUND, format!("Document '{filename}' not found")));
    }
    std::fs::remove_file(&path).map_err(internal)?;
    reload(&state).await?;
    Ok(Json(serde_json::json!({ "message": format!("Document '{filename}' deleted successfully") })))
}

async fn rebuild_index(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let documents = reload(&state).await?;
    let message = if documents == 0 { "No documents found to build index" } else { "Index rebuilt successfully" };
    Ok(Json(serde_json::json!({ "message": message, "documents_loaded": documents })))
}

async fn query_history(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "queries": state.engine.history().recent(HISTORY_PAGE) }))
}

async fn system_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (mut files, mut bytes) = (0usize, 0u64);
    if let Ok(entries) = std::fs::read_dir(&state.data_dir) {
        for entry in entries.flatten() {
            if is_supported(&entry.file_name().to_string_lossy()) {
                files += 1;
                bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }
    let stats = state.engine.stats();
    Json(serde_json::json!({
        "total_documents": files,
        "total_size_mb": size_mb(bytes),
        "system_uptime": uptime(state.started_at),
        "queries_processed": stats.queries_served,
        "documents_loaded": stats.documents,
        "chunks_created": stats.chunks,
        "indexed_words": stats.terms,
        "cache_size": stats.cache_entries,
        "corpus_generation": stats.generation,
        "supported_formats": SUPPORTED_FORMATS,
    }))
}

async fn download_answer(State(state): State<AppState>, Json(req): Json<DownloadRequest>) -> Result<Response, ApiError> {
    let Some(format) = ReportFormat::parse(&req.format) else {
        return Err((StatusCode::BAD_REQUEST, "Unsupported format. Use 'txt' or 'json'".into()));
    };
    let outcome = state.engine.search(&req.query, 3, None).map_err(engine_error)?;
    let mut report = Report::new(&req.query, &outcome);
    report.include_sources = req.include_sources;
    report.include_metadata = req.include_metadata;

    let disposition = format!("attachment; filename={}", Report::file_name(format));
    Ok((
        [(header::CONTENT_TYPE, format.content_type().to_string()), (header::CONTENT_DISPOSITION, disposition)],
        report.render(format),
    )
        .into_response())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(required) = &state.admin_token else { return Ok(()) };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
