//! REST API server for the document analyzer
//!
//! Receives a PDF upload, stages it under the data directory, runs the
//! four-stage analysis and always removes the staged file afterwards.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{effective_query, FinancialAnalyzer};
use crate::Result;

/// Uploads larger than this are rejected by the body limit layer
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub query: String,
    pub analysis: String,
    pub file_processed: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub analyzer: Arc<FinancialAnalyzer>,
    pub data_dir: PathBuf,
    /// Cancelled on server shutdown; every run holds a child token
    pub shutdown: CancellationToken,
}

/// Staged upload, deleted when dropped
struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    async fn write(data_dir: &Path, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(format!("financial_document_{}.pdf", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
            }
        }
    }
}

/// =============================
/// Endpoints
/// =============================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Financial Document Analyzer API is running"
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze_document(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<ApiResponse>) {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    let mut query = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(format!("Invalid multipart body: {}", e))),
                )
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes.to_vec())),
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ApiResponse::error(format!("Failed to read upload: {}", e))),
                        )
                    }
                }
            }
            Some("query") => match field.text().await {
                Ok(text) => query = text,
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ApiResponse::error(format!("Failed to read query: {}", e))),
                    )
                }
            },
            _ => {}
        }
    }

    let Some((filename, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No file uploaded".into())),
        );
    };

    let query = effective_query(&query);
    info!(file = ?filename, bytes = bytes.len(), query = %query, "Received analysis request");

    let staged = match StagedUpload::write(&state.data_dir, &bytes).await {
        Ok(staged) => staged,
        Err(e) => {
            error!(error = %e, "Failed to stage upload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Error processing document: {}", e))),
            );
        }
    };

    let cancel = state.shutdown.child_token();
    let document_path = staged.path.to_string_lossy().to_string();
    let result = state
        .analyzer
        .run_analysis(&document_path, &query, &cancel)
        .await;
    drop(staged);

    match result {
        Ok(analysis) => (
            StatusCode::OK,
            Json(ApiResponse::success(AnalysisResponse {
                status: "success".to_string(),
                query,
                analysis,
                file_processed: filename,
            })),
        ),
        Err(e) => {
            error!(error = %e, "Analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Error processing document: {}", e))),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze", post(analyze_document))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    analyzer: Arc<FinancialAnalyzer>,
    port: u16,
    data_dir: PathBuf,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    let router = create_router(ApiState {
        analyzer,
        data_dir,
        shutdown: shutdown.clone(),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested, cancelling in-flight analyses");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
