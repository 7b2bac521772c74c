//! Retriever trait — semantic context lookup for the latest user message.
//!
//! Retrieval is an enhancement: the orchestrator treats every error from a
//! retriever as "no context" and carries on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A passage returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Document ID in the backing index
    pub id: String,

    /// Similarity score (cosine-like, higher is closer)
    pub score: f32,

    /// The passage text
    pub text: String,

    /// Free-form metadata stored alongside the passage
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Returns passages relevant to a query.
///
/// Implementations must return results ordered by descending `score`,
/// truncated to `limit`, with every `score >= score_threshold`. Repeating a
/// query against an unchanged index must yield the same ordered result.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Backend name (e.g., "qdrant", "memory", "none").
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError>;

    /// Whether the backing store is reachable. Never fails.
    async fn health(&self) -> bool;
}

/// Sort passages by descending score and apply the limit/threshold contract.
///
/// Ties are broken by ascending id so equal-scored passages keep a stable order.
pub fn rank_passages(
    mut passages: Vec<RetrievedPassage>,
    limit: usize,
    score_threshold: f32,
) -> Vec<RetrievedPassage> {
    passages.retain(|p| p.score >= score_threshold);
    passages.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    passages.truncate(limit);
    passages
}
