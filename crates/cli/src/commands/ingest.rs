//! `localmind ingest` — Chunk text files and store them for retrieval.

use std::path::PathBuf;

use anyhow::Context;
use localmind_config::{AppConfig, RetrievalBackend};
use localmind_retrieval::{Document, DocumentSink, chunk_text};
use tracing::{info, warn};

use super::build_retrieval;

/// Split a file's text into documents with stable ids (`<path>#<chunk>`).
pub fn documents_for(source: &str, text: &str, chunk_size: usize) -> Vec<Document> {
    chunk_text(text, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            Document::new(format!("{source}#{i}"), chunk)
                .with_metadata("source", serde_json::json!(source))
                .with_metadata("chunk", serde_json::json!(i))
        })
        .collect()
}

pub async fn run(config: &AppConfig, files: &[PathBuf], chunk_size: usize) -> anyhow::Result<()> {
    let stack = build_retrieval(config)?;
    let Some(sink) = stack.sink else {
        anyhow::bail!("Retrieval backend 'none' cannot store documents; set retrieval.backend");
    };
    if config.retrieval.backend == RetrievalBackend::Memory {
        warn!("The memory backend does not persist; documents are dropped when this command exits");
    }

    let mut total = 0;
    for file in files {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let source = file.display().to_string();
        let documents = documents_for(&source, &text, chunk_size);
        if documents.is_empty() {
            warn!(file = %source, "Nothing to ingest");
            continue;
        }

        let stored = sink
            .add_documents(documents)
            .await
            .with_context(|| format!("Failed to store {source}"))?;
        info!(file = %source, chunks = stored, "Ingested");
        println!("  {source}: {stored} chunk(s)");
        total += stored;
    }

    println!("Stored {total} chunk(s) from {} file(s)", files.len());
    Ok(())
}
