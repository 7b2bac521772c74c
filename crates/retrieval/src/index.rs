//! Vector index trait and the in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use localmind_core::retrieval::rank_passages;
use localmind_core::{RetrievalError, RetrievedPassage};
use tokio::sync::RwLock;

use crate::vector::cosine_similarity;

/// A document chunk with its embedding, ready to be stored.
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Similarity search over stored vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Create the backing collection if it does not exist. Idempotent.
    async fn ensure_collection(&self) -> Result<(), RetrievalError>;

    /// Insert or replace points by id.
    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<(), RetrievalError>;

    /// Nearest neighbours of `vector`, best first, with `score >= score_threshold`.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError>;

    async fn health(&self) -> bool;
}

/// Stores points in a Vec and scores them with cosine similarity.
/// Useful for tests and for small corpora ingested at startup.
pub struct InMemoryIndex {
    points: Arc<RwLock<Vec<IndexedPoint>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            points: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        Ok(())
    }

    async fn upsert(&self, new_points: Vec<IndexedPoint>) -> Result<(), RetrievalError> {
        let mut points = self.points.write().await;
        for point in new_points {
            match points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => points.push(point),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let points = self.points.read().await;
        let scored = points
            .iter()
            .map(|p| RetrievedPassage {
                id: p.id.clone(),
                score: cosine_similarity(&p.vector, vector),
                text: p.text.clone(),
                metadata: p.metadata.clone(),
            })
            .collect();
        Ok(rank_passages(scored, limit, score_threshold))
    }

    async fn health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>) -> IndexedPoint {
        IndexedPoint {
            id: id.into(),
            vector,
            text: format!("doc {id}"),
            metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![
                point("far", vec![0.0, 1.0]),
                point("near", vec![1.0, 0.1]),
                point("exact", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2, 0.5).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = InMemoryIndex::new();
        index.upsert(vec![point("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![point("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len().await, 1);

        let hits = index.search(&[0.0, 1.0], 5, 0.9).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn repeated_search_is_deterministic() {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![point("b", vec![1.0, 0.0]), point("a", vec![2.0, 0.0])])
            .await
            .unwrap();

        let first = index.search(&[1.0, 0.0], 5, 0.0).await.unwrap();
        let second = index.search(&[1.0, 0.0], 5, 0.0).await.unwrap();
        assert_eq!(first, second);
        // Equal scores fall back to id order
        assert_eq!(first[0].id, "a");
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let index = InMemoryIndex::default();
        assert!(index.is_empty().await);
        assert!(index.search(&[1.0], 3, 0.0).await.unwrap().is_empty());
    }
}
