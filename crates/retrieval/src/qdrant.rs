//! Qdrant backend over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use localmind_core::retrieval::rank_passages;
use localmind_core::{RetrievalError, RetrievedPassage};
use serde::Deserialize;
use tracing::{debug, info};

use crate::index::{IndexedPoint, VectorIndex};

/// Payload key holding the caller's document id when it had to be mapped.
const DOC_ID_KEY: &str = "doc_id";

/// A single Qdrant collection with cosine distance.
pub struct QdrantIndex {
    base_url: String,
    collection: String,
    vector_size: usize,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QdrantEnvelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    #[serde(default)]
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Map<String, serde_json::Value>>,
}

impl QdrantIndex {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            vector_size,
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    async fn list_collections(&self) -> Result<Vec<String>, RetrievalError> {
        let response = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(index_error)?;
        let body: QdrantEnvelope<CollectionList> = check(response).await?.json().await.map_err(index_error)?;
        Ok(body.result.collections.into_iter().map(|c| c.name).collect())
    }
}

/// Qdrant accepts only unsigned integers and UUIDs as point ids. Anything
/// else is mapped to a name-based UUID and the original kept in the payload.
fn point_id(id: &str) -> (serde_json::Value, bool) {
    if let Ok(n) = id.parse::<u64>() {
        return (serde_json::json!(n), false);
    }
    if let Ok(uuid) = uuid::Uuid::parse_str(id) {
        return (serde_json::json!(uuid.to_string()), false);
    }
    let mapped = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, id.as_bytes());
    (serde_json::json!(mapped.to_string()), true)
}

fn index_error(e: reqwest::Error) -> RetrievalError {
    RetrievalError::Index(e.to_string())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RetrievalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RetrievalError::Index(format!("status {status}: {body}")))
}

fn to_passage(point: ScoredPoint) -> RetrievedPassage {
    let mut payload = point.payload.unwrap_or_default();
    let id = match payload.remove(DOC_ID_KEY) {
        Some(serde_json::Value::String(doc_id)) => doc_id,
        _ => match point.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        },
    };
    let text = match payload.remove("text") {
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    };
    let metadata = match payload.remove("metadata") {
        Some(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    RetrievedPassage {
        id,
        score: point.score,
        text,
        metadata,
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        if self.list_collections().await?.contains(&self.collection) {
            return Ok(());
        }

        info!(collection = %self.collection, size = self.vector_size, "Creating Qdrant collection");
        let response = self
            .client
            .put(self.collection_url())
            .json(&serde_json::json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(index_error)?;
        check(response).await?;
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<(), RetrievalError> {
        if points.is_empty() {
            return Ok(());
        }

        let body: Vec<serde_json::Value> = points
            .into_iter()
            .map(|p| {
                let (id, mapped) = point_id(&p.id);
                let mut payload = serde_json::json!({ "text": p.text, "metadata": p.metadata });
                if mapped {
                    payload[DOC_ID_KEY] = serde_json::json!(p.id);
                }
                serde_json::json!({ "id": id, "vector": p.vector, "payload": payload })
            })
            .collect();

        debug!(collection = %self.collection, count = body.len(), "Upserting points");
        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&serde_json::json!({ "points": body }))
            .send()
            .await
            .map_err(index_error)?;
        check(response).await?;
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&serde_json::json!({
                "vector": vector,
                "limit": limit,
                "score_threshold": score_threshold,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(index_error)?;

        let body: QdrantEnvelope<Vec<ScoredPoint>> =
            check(response).await?.json().await.map_err(index_error)?;

        // Qdrant already orders and filters; re-ranking pins the tie order
        let passages = body.result.into_iter().map(to_passage).collect();
        Ok(rank_passages(passages, limit, score_threshold))
    }

    async fn health(&self) -> bool {
        self.list_collections().await.is_ok()
    }
}
