//! Voice turn endpoints: audio processing, wake-word check, audio playback

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::pipeline::{TurnOutcome, WakewordOutcome};

/// Build the voice turn router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/process_input", post(process_input))
        .route("/detect_wakeword", post(detect_wakeword))
        .route("/audio_response", get(audio_response))
        .with_state(state)
}

/// Identity query parameter shared by the voice endpoints
#[derive(Deserialize)]
struct RobotQuery {
    robot_id: Option<String>,
}

impl RobotQuery {
    /// The robot identity, rejecting absent or blank values
    fn require(&self) -> Result<&str, ApiError> {
        self.robot_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingRobotId)
    }
}

/// Unwrap the audio body, keeping body-limit rejections structured
///
/// Payloads the body-limit layer refuses to buffer still come back as the
/// JSON `payload_too_large` error, not axum's bare rejection.
fn read_audio(body: Result<Bytes, BytesRejection>) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::Internal(rejection.body_text())
        }
    })
}

/// Process one audio utterance
///
/// The robot identity is validated before any collaborator runs.
async fn process_input(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RobotQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let robot_id = query.require()?;
    let body = read_audio(body)?;

    let outcome = state.pipeline.process_audio(robot_id, &body).await?;
    Ok(Json(outcome))
}

/// Check audio for a wake phrase
async fn detect_wakeword(
    State(state): State<Arc<ApiState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WakewordOutcome>, ApiError> {
    let body = read_audio(body)?;
    let outcome = state.pipeline.detect_wakeword(&body).await?;
    Ok(Json(outcome))
}

/// Stream the robot's current response audio
async fn audio_response(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RobotQuery>,
) -> Result<Response, ApiError> {
    let robot_id = query.require()?;

    let audio = state.audio_store.read(robot_id).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "audio/mpeg")],
        audio,
    )
        .into_response())
}
