//! In-memory [`VectorStore`] for tests.
//!
//! Brute-force cosine similarity over a `RwLock`'d map, mirroring the
//! SQLite store's ordering guarantees so pipeline tests observe the same
//! behavior without a database file.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{StoreError, VectorStore};
use crate::embedding::cosine_similarity;
use crate::models::{Chunk, RetrievedChunk};

#[derive(Default)]
pub struct MemoryStore {
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn setup(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        for chunk in chunks {
            if chunk.vector.is_none() {
                return Err(StoreError::InvariantViolation(format!(
                    "chunk {} has no vector at persist time",
                    chunk.chunk_id
                )));
            }
        }

        let mut stored = self.chunks.write().unwrap();
        for chunk in chunks {
            stored.insert(chunk.chunk_id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let stored = self.chunks.read().unwrap();

        let mut candidates: Vec<RetrievedChunk> = stored
            .values()
            .map(|chunk| {
                let score = chunk
                    .vector
                    .as_ref()
                    .map(|v| cosine_similarity(query_vec, v) as f64)
                    .unwrap_or(0.0);
                RetrievedChunk {
                    chunk_id: chunk.chunk_id.clone(),
                    doc_name: chunk.doc_name.clone(),
                    text: chunk.text.clone(),
                    score,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        candidates.truncate(k);

        Ok(candidates)
    }

    async fn get(&self, chunk_id: &str) -> Result<Option<Chunk>, StoreError> {
        Ok(self.chunks.read().unwrap().get(chunk_id).cloned())
    }

    async fn chunks_for_doc(&self, doc_name: &str) -> Result<Vec<Chunk>, StoreError> {
        let stored = self.chunks.read().unwrap();
        let mut chunks: Vec<Chunk> = stored
            .values()
            .filter(|c| c.doc_name == doc_name)
            .cloned()
            .collect();
        chunks.sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id));
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, doc: &str, vector: Option<Vec<f32>>) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            text: format!("text of {}", id),
            doc_name: doc.to_string(),
            vector,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_top_result() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                chunk("aa:0001", "case_1", Some(vec![1.0, 0.0])),
                chunk("bb:0001", "case_2", Some(vec![0.0, 1.0])),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "aa:0001");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_empty_store_search_is_empty() {
        let store = MemoryStore::new();
        assert!(store.search(&[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vectorless_chunk_rejected() {
        let store = MemoryStore::new();
        let err = store
            .upsert(&[chunk("aa:0001", "case_1", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = MemoryStore::new();
        store
            .upsert(&[chunk("aa:0001", "case_1", Some(vec![1.0]))])
            .await
            .unwrap();
        store
            .upsert(&[chunk("aa:0001", "case_1", Some(vec![2.0]))])
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        let got = store.get("aa:0001").await.unwrap().unwrap();
        assert_eq!(got.vector, Some(vec![2.0]));
    }
}
