//! No-op retriever — disables context lookup entirely.

use async_trait::async_trait;
use localmind_core::{RetrievalError, RetrievedPassage, Retriever};

/// A retriever that never finds anything.
pub struct NoopRetriever;

#[async_trait]
impl Retriever for NoopRetriever {
    fn name(&self) -> &str {
        "none"
    }

    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        Ok(Vec::new())
    }

    async fn health(&self) -> bool {
        true
    }
}
