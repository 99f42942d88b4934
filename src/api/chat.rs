//! Text chat and interaction history endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::db::{self, ChatLogEntry};
use crate::pipeline::ChatTurn;

/// Default number of history entries returned
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Build the chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/text_chat", post(text_chat))
        .route("/api/chat-logs", get(chat_logs))
        .with_state(state)
}

/// Text chat request
#[derive(Deserialize)]
struct TextChatRequest {
    message: String,
    robot_id: Option<String>,
}

/// Run a text-only turn through the grounded generation path
async fn text_chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TextChatRequest>,
) -> Result<Json<ChatTurn>, ApiError> {
    let robot_id = request
        .robot_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingRobotId)?;

    if request.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let turn = state.pipeline.text_chat(robot_id, &request.message).await?;
    Ok(Json(turn))
}

/// Chat history query
#[derive(Deserialize)]
struct ChatLogQuery {
    robot_id: Option<String>,
    limit: Option<usize>,
}

/// List persisted turns for a robot, newest first
async fn chat_logs(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ChatLogQuery>,
) -> Result<Json<Vec<ChatLogEntry>>, ApiError> {
    let robot_id = query
        .robot_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingRobotId)?;

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let repo = state.chat_logs.clone();
    let robot = robot_id.to_string();
    let logs = db::run_blocking(move || repo.list(&robot, limit)).await?;
    Ok(Json(logs))
}
