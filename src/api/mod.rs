//! HTTP API for the Michi gateway

pub mod chat;
pub mod health;
pub mod knowledge;
pub mod process;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::audio_store::AudioStateStore;
use crate::db::{ChatLogRepo, DbPool};
use crate::knowledge::KnowledgeStore;
use crate::pipeline::Pipeline;
use crate::{Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
    pub audio_store: AudioStateStore,
    pub chat_logs: ChatLogRepo,
    pub knowledge: Arc<KnowledgeStore>,
    pub max_audio_bytes: usize,
    pub db: DbPool,
}

/// Build the full router with all routes and layers
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Body limit sits above the pipeline's own size check so oversized
    // payloads get the structured 413 instead of a bare rejection
    let body_limit = state.max_audio_bytes + 1024;

    Router::new()
        .merge(process::router(state.clone()))
        .merge(chat::router(state.clone()))
        .merge(knowledge::router(state.clone()))
        .merge(health::router())
        .merge(health::ready_router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the API
///
/// # Errors
///
/// Returns error if the server fails to bind or run
pub async fn serve(state: Arc<ApiState>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

    tracing::info!(port, "API server listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Config(format!("API server error: {e}")))?;

    Ok(())
}

/// API errors rendered as structured JSON
#[derive(Debug)]
pub enum ApiError {
    MissingRobotId,
    EmptyMessage,
    MissingFile,
    PayloadTooLarge(String),
    NotFound(String),
    TranscriptionFailed(String),
    GenerationFailed(String),
    SynthesisFailed(String),
    RetrievalFailed(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::PayloadTooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            Error::NotFound(msg) => Self::NotFound(msg),
            Error::Stt(msg) => Self::TranscriptionFailed(msg),
            Error::Llm(msg) => Self::GenerationFailed(msg),
            Error::Tts(msg) => Self::SynthesisFailed(msg),
            Error::Embedding(msg) | Error::Database(msg) => Self::RetrievalFailed(msg),
            Error::Sqlite(e) => Self::RetrievalFailed(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(serde::Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::MissingRobotId => (
                StatusCode::BAD_REQUEST,
                "missing_robot_id",
                "robot_id query parameter is required".to_string(),
            ),
            Self::EmptyMessage => (
                StatusCode::BAD_REQUEST,
                "empty_message",
                "message must not be empty".to_string(),
            ),
            Self::MissingFile => (
                StatusCode::BAD_REQUEST,
                "missing_file",
                "multipart field 'file' is required".to_string(),
            ),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::TranscriptionFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "transcription_failed",
                msg,
            ),
            Self::GenerationFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "generation_failed", msg)
            }
            Self::SynthesisFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", msg)
            }
            Self::RetrievalFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "retrieval_failed", msg)
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}
