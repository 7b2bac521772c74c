//! Context augmentation for the last user message.

use localmind_core::retrieval::RetrievedPassage;

/// Build the augmented query text sent in place of the user's message.
///
/// Passages are joined by newlines, in the order the retriever ranked them.
pub fn augment_query(passages: &[RetrievedPassage], query: &str) -> String {
    let context = passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!("Context: {context}\n\nQuery: {query}")
}
