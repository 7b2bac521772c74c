//! `VectorRetriever` — embed the query, search the index, bound the wait.

use std::time::Duration;

use async_trait::async_trait;
use localmind_core::{RetrievalError, RetrievedPassage, Retriever};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedder::Embedder;
use crate::index::{IndexedPoint, VectorIndex};

/// A text document to be embedded and stored.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Write side of a retriever: accepts documents for later search.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Embed and store documents. Returns how many were stored.
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, RetrievalError>;
}

/// Retriever backed by an [`Embedder`] and a [`VectorIndex`].
pub struct VectorRetriever<E, I> {
    embedder: E,
    index: I,
    timeout: Duration,
    collection_ready: OnceCell<()>,
}

impl<E: Embedder, I: VectorIndex> VectorRetriever<E, I> {
    pub fn new(embedder: E, index: I) -> Self {
        Self {
            embedder,
            index,
            timeout: Duration::from_secs(10),
            collection_ready: OnceCell::new(),
        }
    }

    /// Bound on a whole search (embedding plus index lookup).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        self.collection_ready
            .get_or_try_init(|| self.index.ensure_collection())
            .await
            .map(|_| ())
    }

    /// Embed and store a single document.
    pub async fn add_document(
        &self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), RetrievalError> {
        let document = Document {
            id: id.into(),
            text: text.into(),
            metadata,
        };
        self.add_documents(vec![document]).await.map(|_| ())
    }

    async fn search_inner(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("no embedding returned for query".into()))?;
        self.index.search(&vector, limit, score_threshold).await
    }
}

#[async_trait]
impl<E: Embedder, I: VectorIndex> Retriever for VectorRetriever<E, I> {
    fn name(&self) -> &str {
        self.index.name()
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let passages = tokio::time::timeout(self.timeout, self.search_inner(query, limit, score_threshold))
            .await
            .map_err(|_| RetrievalError::Timeout(self.timeout.as_millis() as u64))??;

        debug!(backend = self.index.name(), hits = passages.len(), "Retrieval complete");
        Ok(passages)
    }

    async fn health(&self) -> bool {
        self.index.health().await
    }
}

#[async_trait]
impl<E: Embedder, I: VectorIndex> DocumentSink for VectorRetriever<E, I> {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, RetrievalError> {
        if documents.is_empty() {
            return Ok(0);
        }
        self.ensure_collection().await?;

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                vectors.len()
            )));
        }

        let points: Vec<IndexedPoint> = documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, vector)| IndexedPoint {
                id: doc.id,
                vector,
                text: doc.text,
                metadata: doc.metadata,
            })
            .collect();
        let count = points.len();
        self.index.upsert(points).await?;

        info!(backend = self.index.name(), count, "Documents stored");
        Ok(count)
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring
/// paragraph breaks. Paragraphs longer than the limit are split hard.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_len = paragraph.chars().count();
        let current_len = current.chars().count();

        if current_len > 0 && current_len + 2 + para_len > max_chars {
            chunks.push(std::mem::take(&mut current));
        }

        if para_len > max_chars {
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
