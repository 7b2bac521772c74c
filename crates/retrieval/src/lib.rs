//! Context retrieval for localmind.
//!
//! A [`VectorRetriever`] embeds the query with an [`Embedder`] and looks it up
//! in a [`VectorIndex`]. Backends:
//! - `qdrant`: [`QdrantIndex`] over Qdrant's REST API
//! - `memory`: [`InMemoryIndex`], process-local
//! - `none`: [`NoopRetriever`], retrieval disabled

pub mod embedder;
pub mod index;
pub mod noop;
pub mod qdrant;
pub mod retriever;
pub mod vector;

use std::sync::Arc;
use std::time::Duration;

use localmind_config::{RetrievalBackend, RetrievalConfig};
use localmind_core::{RetrievalError, Retriever};

pub use embedder::{Embedder, HttpEmbedder};
pub use index::{InMemoryIndex, IndexedPoint, VectorIndex};
pub use noop::NoopRetriever;
pub use qdrant::QdrantIndex;
pub use retriever::{chunk_text, Document, DocumentSink, VectorRetriever};
pub use vector::cosine_similarity;

/// The read and write handles for the configured backend.
#[derive(Clone)]
pub struct RetrievalStack {
    pub retriever: Arc<dyn Retriever>,
    /// `None` when the backend cannot store documents.
    pub sink: Option<Arc<dyn DocumentSink>>,
}

/// Build the retriever selected by `config.backend`.
pub fn build_from_config(config: &RetrievalConfig) -> Result<RetrievalStack, RetrievalError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.backend {
        RetrievalBackend::None => Ok(RetrievalStack {
            retriever: Arc::new(NoopRetriever),
            sink: None,
        }),
        RetrievalBackend::Memory => {
            let embedder = HttpEmbedder::new(&config.embed_url, timeout)?;
            let retriever = Arc::new(VectorRetriever::new(embedder, InMemoryIndex::new()).with_timeout(timeout));
            Ok(RetrievalStack {
                retriever: retriever.clone(),
                sink: Some(retriever),
            })
        }
        RetrievalBackend::Qdrant => {
            let embedder = HttpEmbedder::new(&config.embed_url, timeout)?;
            let index = QdrantIndex::new(&config.qdrant_url, &config.collection, config.vector_size, timeout)?;
            let retriever = Arc::new(VectorRetriever::new(embedder, index).with_timeout(timeout));
            Ok(RetrievalStack {
                retriever: retriever.clone(),
                sink: Some(retriever),
            })
        }
    }
}
