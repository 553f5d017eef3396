//! Vector store abstraction.
//!
//! The pipeline depends only on the [`VectorStore`] contract; the backing
//! technology is an implementation detail. [`SqliteStore`] is the
//! production backend; [`MemoryStore`] backs tests.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::models::{Chunk, RetrievedChunk};

/// Store-level error taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached or initialized. Fatal to a run.
    Unavailable(String),
    /// A chunk reached the store without a vector. Programmer error; must
    /// never occur in correct operation.
    InvariantViolation(String),
    /// A read or write against a healthy store failed.
    Query(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(e) => write!(f, "vector store unavailable: {}", e),
            StoreError::InvariantViolation(e) => write!(f, "invariant violation: {}", e),
            StoreError::Query(e) => write!(f, "store query failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence contract for the knowledge base.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent schema/index creation. Safe to call every run.
    async fn setup(&self) -> Result<(), StoreError>;

    /// Bulk write. Overwrites any existing entry sharing a `chunk_id`;
    /// each chunk is written atomically. Fails with
    /// [`StoreError::InvariantViolation`] if any chunk lacks a vector,
    /// before anything is written.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<(), StoreError>;

    /// Top-`k` chunks by descending cosine similarity to `query_vec`.
    /// Ties break on ascending `chunk_id` so results are deterministic.
    /// An empty store yields an empty list, never an error.
    async fn search(&self, query_vec: &[f32], k: usize)
        -> Result<Vec<RetrievedChunk>, StoreError>;

    /// Exact-match lookup by chunk id.
    async fn get(&self, chunk_id: &str) -> Result<Option<Chunk>, StoreError>;

    /// All chunks of a document, in chunk-id (document) order.
    async fn chunks_for_doc(&self, doc_name: &str) -> Result<Vec<Chunk>, StoreError>;
}
