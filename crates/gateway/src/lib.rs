//! HTTP gateway for RagDesk.
//!
//! Exposes the chat endpoint, document upload and a health check.
//! Built on Axum; all collaborators are built once at startup and
//! shared across requests through [`AppState`].

pub mod services;

pub use services::{Services, StartupError};

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use ragdesk_core::ingest::{DocumentIngestor, UploadedFile};
use ragdesk_pipeline::{ChatPipeline, PipelineError, TurnInput};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Room for multipart boundaries and part headers on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    pub ingestor: Arc<dyn DocumentIngestor>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(services: &Services, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: services.pipeline.clone(),
            ingestor: services.ingestor.clone(),
            max_upload_bytes,
        }
    }
}

type SharedState = Arc<AppState>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build the Axum router with all gateway routes.
///
/// CORS is open to any origin. Uploads larger than
/// `state.max_upload_bytes` are rejected with 413.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let upload = post(upload_handler).layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/api/upload", upload)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until Ctrl-C.
pub async fn start(config: ragdesk_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services::from_config(&config).await?;
    let state = Arc::new(AppState::new(&services, config.ingest.max_upload_bytes));
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<TurnInput>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Malformed chat request");
        api_error(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    // Dropping the request future (client gone) cancels the turn.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.pipeline.run_with_cancel(input, &cancel).await {
        Ok(result) => Ok(Json(ChatResponse {
            response: result.answer,
        })),
        Err(PipelineError::InvalidInput(reason)) => Err(api_error(StatusCode::BAD_REQUEST, reason)),
        Err(e) => {
            error!(error = %e, stage = ?e.stage(), "Chat turn failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    status: &'static str,
    chunks: usize,
    document_ids: Vec<String>,
}

async fn upload_handler(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Err(no_file());
    };

    let file = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(read_error)?;
                break UploadedFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                };
            }
            Ok(Some(_)) => continue,
            Ok(None) => return Err(no_file()),
            Err(e) => return Err(read_error(e)),
        }
    };

    if file.file_name.is_empty() && file.bytes.is_empty() {
        return Err(no_file());
    }
    if file.bytes.len() > state.max_upload_bytes {
        return Err(too_large());
    }

    let file_name = file.file_name.clone();
    info!(file = %file_name, bytes = file.bytes.len(), "Upload received");

    match state.ingestor.ingest(file).await {
        Ok(report) => Ok(Json(UploadResponse {
            status: "ingested",
            chunks: report.num_chunks,
            document_ids: report.inserted_ids,
        })),
        Err(e) => {
            error!(file = %file_name, error = %e, "Ingestion failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to ingest document",
            ))
        }
    }
}

fn no_file() -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "No file uploaded")
}

fn too_large() -> ApiError {
    api_error(StatusCode::PAYLOAD_TOO_LARGE, "File too large")
}

fn read_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        warn!(error = %e.body_text(), "Unreadable upload");
        no_file()
    }
}
