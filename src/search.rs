//! Retrieval path: query text → embedding → similarity search.
//!
//! [`query`] is the complete interface the downstream answer-generation
//! layer consumes; [`run_query`] wraps it for the CLI.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::{embed_query, Embedder};
use crate::models::RetrievedChunk;
use crate::store::VectorStore;

/// Retrieve the top-`k` chunks for a query, ranked by descending
/// similarity. A blank query yields no results. An empty store yields an
/// empty list, never an error.
pub async fn query(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    text: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embed_query(embedder, text).await?;
    let results = store.search(&query_vec, k).await?;
    Ok(results)
}

/// Run a query and print ranked results.
pub async fn run_query(
    config: &Config,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    text: &str,
    k: Option<usize>,
) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.top_k);
    let results = query(store, embedder, text, k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, result.score, result.doc_name);
        println!("    excerpt: \"{}\"", excerpt(&result.text, 240));
        println!("    chunk: {}", result.chunk_id);
        println!();
    }

    Ok(())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ");
    cleaned.trim().chars().take(max_chars).collect()
}
