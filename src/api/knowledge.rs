//! Knowledge document endpoints

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::knowledge::KnowledgeDocument;

/// Build the knowledge router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/rag/knowledge", post(upload_document))
        .route("/rag/knowledge", get(list_documents))
        .route("/rag/knowledge/{id}", delete(delete_document))
        .with_state(state)
}

/// Upload response
#[derive(Serialize)]
struct UploadResponse {
    id: String,
    chunks: usize,
}

/// Ingest a document from a multipart upload
///
/// Expects a `file` part with the document text; an optional `robot_id`
/// part scopes the document to one robot, otherwise it is global.
async fn upload_document(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut robot_id: Option<String> = None;
    let mut name: Option<String> = None;
    let mut text: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    {
        match field.name() {
            Some("robot_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    robot_id = Some(trimmed.to_string());
                }
            }
            Some("file") => {
                name = field.file_name().map(ToString::to_string);
                text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::Internal(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let text = text.ok_or(ApiError::MissingFile)?;
    let name = name.unwrap_or_else(|| "document.txt".to_string());

    let (id, chunks) = state
        .knowledge
        .insert_document(robot_id.as_deref(), &name, &text)
        .await?;

    Ok(Json(UploadResponse { id, chunks }))
}

/// List all stored documents
async fn list_documents(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<KnowledgeDocument>>, ApiError> {
    let docs = state.knowledge.list().await?;
    Ok(Json(docs))
}

/// Delete response
#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

/// Delete a document and its vectors
async fn delete_document(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.knowledge.delete(&id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("knowledge document {id}")));
    }
    Ok(Json(DeleteResponse { deleted }))
}
