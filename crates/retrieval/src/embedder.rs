//! Text embedding clients.

use std::time::Duration;

use async_trait::async_trait;
use localmind_core::RetrievalError;
use serde::Deserialize;
use tracing::debug;

/// Turns text into dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch. The output has one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    async fn health(&self) -> bool {
        true
    }
}

/// Client for a sentence-transformers style embedding service.
///
/// POST `{base_url}/embed` with `{"inputs": [...]}`, expecting
/// `{"data": [{"embedding": [...]}, ...]}`.
pub struct HttpEmbedder {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), "Requesting embeddings");

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&serde_json::json!({ "inputs": texts }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::Embedding(format!("timed out: {e}"))
                } else {
                    RetrievalError::Embedding(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!("status {status}: {body}")));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("Failed to parse response: {e}")))?;

        // The service reports model failures in-band with a 200
        if let Some(error) = body.error {
            return Err(RetrievalError::Embedding(error));
        }

        if body.data.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn health(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
