//! Knowledge retrieval and relevance gating
//!
//! Retrieval produces ranked [`KnowledgeCandidate`]s; the [`RelevanceGate`]
//! decides which of them are close enough to ground a response. Candidates
//! that pass are joined into a single knowledge block for the prompt.

pub mod chunker;
pub mod embedder;
pub mod store;

pub use chunker::chunk_text;
pub use embedder::{Embedder, TextEmbedder, EMBEDDING_DIM};
pub use store::{KnowledgeDocument, KnowledgeStore};

use async_trait::async_trait;

use crate::Result;

/// A retrieved knowledge chunk with its distance score
///
/// Scores are L2 distances from the vector index: lower means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeCandidate {
    pub content: String,
    pub score: f32,
}

/// Retrieves knowledge candidates for a query
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Fetch the k nearest candidates for a query, scoped to a robot
    ///
    /// # Errors
    ///
    /// Returns error if retrieval fails
    async fn retrieve(&self, robot_id: &str, query: &str, k: usize) -> Result<Vec<KnowledgeCandidate>>;
}

/// Deterministic relevance filter over distance scores
#[derive(Debug, Clone, Copy)]
pub struct RelevanceGate {
    threshold: f32,
}

impl RelevanceGate {
    /// Create a gate with the given distance threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Keep candidates with `score <= threshold`, preserving ranking order
    #[must_use]
    pub fn select(&self, candidates: Vec<KnowledgeCandidate>) -> Vec<KnowledgeCandidate> {
        candidates
            .into_iter()
            .filter(|c| c.score <= self.threshold)
            .collect()
    }
}

/// Join passing candidates into the prompt's knowledge block
#[must_use]
pub fn format_knowledge(candidates: &[KnowledgeCandidate]) -> String {
    candidates
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
