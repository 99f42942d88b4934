//! sqlite-vec backed knowledge repository
//!
//! Documents are chunked, embedded, and stored with their vectors. Retrieval
//! is a KNN query over the chunk vectors scoped to one robot: a chunk is
//! visible to a robot when it belongs to that robot or to no robot (global).
//! All rusqlite work runs through `db::run_blocking`, off the async executor.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::chunker::chunk_text;
use super::embedder::{Embedder, TextEmbedder};
use super::{KnowledgeCandidate, Retriever};
use crate::db::{self, DbPool};
use crate::{Error, Result};

/// KNN over-fetch factor; extra rows cover chunks filtered out by robot scope
const OVERFETCH: usize = 3;

/// A stored knowledge document
#[derive(Debug, Clone, serde::Serialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub robot_id: Option<String>,
    pub name: String,
    pub chunk_count: usize,
    pub created_at: String,
}

/// Knowledge document store
#[derive(Clone)]
pub struct KnowledgeStore {
    pool: DbPool,
    embedder: Arc<dyn TextEmbedder>,
}

impl KnowledgeStore {
    /// Create a store over the given pool and embedder
    #[must_use]
    pub fn new(pool: DbPool, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { pool, embedder }
    }

    /// Ingest a document: chunk, embed, and store
    ///
    /// A `robot_id` of `None` makes the document visible to every robot.
    /// The document row and all chunk/vector rows commit in one transaction;
    /// a failure mid-ingest leaves nothing behind.
    /// Returns the document id and the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns error if embedding or storage fails
    pub async fn insert_document(
        &self,
        robot_id: Option<&str>,
        name: &str,
        text: &str,
    ) -> Result<(String, usize)> {
        let chunks = chunk_text(text);
        if chunks.is_empty() {
            return Err(Error::Database("document is empty".to_string()));
        }

        let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&chunk_refs).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let doc_id = format!("doc_{}", Uuid::new_v4());
        let count = chunks.len();

        let pool = self.pool.clone();
        let id = doc_id.clone();
        let robot = robot_id.map(ToString::to_string);
        let doc_name = name.to_string();
        db::run_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO knowledge_docs (id, robot_id, name, chunk_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, robot, doc_name, count, Utc::now().to_rfc3339()],
            )?;

            for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
                let chunk_id = format!("chk_{}", Uuid::new_v4());
                tx.execute(
                    "INSERT INTO knowledge_chunks (id, doc_id, content) VALUES (?1, ?2, ?3)",
                    rusqlite::params![chunk_id, id, chunk],
                )?;
                tx.execute(
                    "INSERT INTO chunks_vec (chunk_id, embedding) VALUES (?1, ?2)",
                    rusqlite::params![chunk_id, Embedder::to_bytes(embedding)],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::info!(doc_id = %doc_id, chunks = count, robot_id = ?robot_id, "knowledge document stored");
        Ok((doc_id, count))
    }

    /// List all stored documents, newest first
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    pub async fn list(&self) -> Result<Vec<KnowledgeDocument>> {
        let pool = self.pool.clone();
        db::run_blocking(move || {
            let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;

            let mut stmt = conn.prepare(
                "SELECT id, robot_id, name, chunk_count, created_at
                 FROM knowledge_docs ORDER BY created_at DESC",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok(KnowledgeDocument {
                    id: row.get(0)?,
                    robot_id: row.get(1)?,
                    name: row.get(2)?,
                    chunk_count: row.get::<_, i64>(3)?.try_into().unwrap_or(0),
                    created_at: row.get(4)?,
                })
            })?;

            Ok(rows.flatten().collect())
        })
        .await
    }

    /// Delete a document together with its chunks and vectors
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails
    pub async fn delete(&self, doc_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = doc_id.to_string();
        db::run_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM chunks_vec WHERE chunk_id IN
                    (SELECT id FROM knowledge_chunks WHERE doc_id = ?1)",
                [&id],
            )?;
            tx.execute("DELETE FROM knowledge_chunks WHERE doc_id = ?1", [&id])?;
            let deleted = tx.execute("DELETE FROM knowledge_docs WHERE id = ?1", [&id])?;

            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    /// KNN search over stored chunk vectors, scoped to a robot
    fn knn(&self, robot_id: &str, embedding: &[f32], k: usize) -> Result<Vec<KnowledgeCandidate>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let embedding_bytes = Embedder::to_bytes(embedding);

        #[allow(clippy::cast_possible_wrap)]
        let fetch_limit = (k * OVERFETCH) as i64;

        let mut stmt = conn.prepare(
            r"SELECT c.content, v.distance
              FROM knowledge_chunks c
              INNER JOIN (
                  SELECT chunk_id, distance
                  FROM chunks_vec
                  WHERE embedding MATCH ?1
                  ORDER BY distance
                  LIMIT ?2
              ) v ON c.id = v.chunk_id
              INNER JOIN knowledge_docs d ON c.doc_id = d.id
              WHERE d.robot_id IS NULL OR d.robot_id = ?3
              ORDER BY v.distance
              LIMIT ?4",
        )?;

        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let rows = stmt.query_map(
            rusqlite::params![embedding_bytes, fetch_limit, robot_id, k as i64],
            |row| {
                Ok(KnowledgeCandidate {
                    content: row.get(0)?,
                    score: row.get::<_, f64>(1)? as f32,
                })
            },
        )?;

        Ok(rows.flatten().collect())
    }
}

#[async_trait]
impl Retriever for KnowledgeStore {
    async fn retrieve(&self, robot_id: &str, query: &str, k: usize) -> Result<Vec<KnowledgeCandidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;

        let store = self.clone();
        let robot = robot_id.to_string();
        let candidates = db::run_blocking(move || store.knn(&robot, &embedding, k)).await?;

        tracing::debug!(
            robot_id,
            candidates = candidates.len(),
            "knowledge retrieval complete"
        );
        Ok(candidates)
    }
}
