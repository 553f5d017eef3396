//! Embedding batcher: fixed-size groups with per-batch failure isolation.
//!
//! Chunks are embedded in groups of `batch_size`. A failing group drops
//! its chunks for the run (they never receive vectors and are never
//! persisted) and the run continues with the next group; the orchestrator
//! reports exactly how many chunks were lost this way.

use crate::embedding::Embedder;
use crate::models::Chunk;

/// Failure of one embedding batch. Recoverable: the batch's chunks are
/// dropped and subsequent batches proceed.
#[derive(Debug)]
pub struct EmbeddingBatchError {
    pub batch_index: usize,
    pub message: String,
}

impl std::fmt::Display for EmbeddingBatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "embedding batch {} failed: {}",
            self.batch_index, self.message
        )
    }
}

impl std::error::Error for EmbeddingBatchError {}

/// Partition the ordered chunk list into groups of at most `batch_size`.
/// The last group may be smaller; order is preserved.
pub fn batchify(chunks: Vec<Chunk>, batch_size: usize) -> Vec<Vec<Chunk>> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    for chunk in chunks {
        current.push(chunk);
        if current.len() == batch_size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Embed one batch in place: compute vectors for the batch's texts and
/// index-zip them onto the chunks.
///
/// The chunk-to-vector mapping is positional, so a response with the wrong
/// count fails the whole batch rather than mis-assigning vectors.
pub async fn embed_batch(
    embedder: &dyn Embedder,
    batch: &mut [Chunk],
    batch_index: usize,
) -> Result<(), EmbeddingBatchError> {
    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

    let vectors = embedder
        .embed(&texts)
        .await
        .map_err(|e| EmbeddingBatchError {
            batch_index,
            message: e.to_string(),
        })?;

    if vectors.len() != batch.len() {
        return Err(EmbeddingBatchError {
            batch_index,
            message: format!("expected {} vectors, got {}", batch.len(), vectors.len()),
        });
    }

    for (chunk, vector) in batch.iter_mut().zip(vectors) {
        chunk.vector = Some(vector);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic stub: maps each text to a vector derived from its bytes.
    struct StubEmbedder {
        dims: usize,
    }

    fn stub_vector(text: &str, dims: usize) -> Vec<f32> {
        let mut vec = vec![0.0f32; dims];
        for (i, b) in text.bytes().enumerate() {
            vec[i % dims] += (b as f32) / 255.0;
        }
        vec
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_name(&self) -> &str {
            "stub"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| stub_vector(t, self.dims)).collect())
        }
    }

    /// Fails the nth embed call, succeeds otherwise.
    struct FlakyEmbedder {
        inner: StubEmbedder,
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky-stub"
        }
        fn dims(&self) -> usize {
            self.inner.dims
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                bail!("synthetic embedding outage");
            }
            self.inner.embed(texts).await
        }
    }

    fn make_chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                chunk_id: format!("deadbeef:{:04}", i + 1),
                text: format!("chunk text number {}", i),
                doc_name: "case".to_string(),
                vector: None,
            })
            .collect()
    }

    #[test]
    fn test_batchify_sizes_and_order() {
        let batches = batchify(make_chunks(10), 4);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 4);
        assert_eq!(batches[1].len(), 4);
        assert_eq!(batches[2].len(), 2);
        assert_eq!(batches[0][0].chunk_id, "deadbeef:0001");
        assert_eq!(batches[2][1].chunk_id, "deadbeef:0010");
    }

    #[test]
    fn test_batchify_exact_multiple() {
        let batches = batchify(make_chunks(8), 4);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 4));
    }

    #[test]
    fn test_batchify_empty() {
        assert!(batchify(Vec::new(), 4).is_empty());
    }

    #[tokio::test]
    async fn test_embed_batch_assigns_in_order() {
        let embedder = StubEmbedder { dims: 8 };
        let mut batch = make_chunks(5);
        embed_batch(&embedder, &mut batch, 0).await.unwrap();

        for chunk in &batch {
            let expected = stub_vector(&chunk.text, 8);
            assert_eq!(chunk.vector.as_ref().unwrap(), &expected);
        }
    }

    #[tokio::test]
    async fn test_embed_batch_deterministic() {
        let embedder = StubEmbedder { dims: 8 };
        let mut a = make_chunks(3);
        let mut b = make_chunks(3);
        embed_batch(&embedder, &mut a, 0).await.unwrap();
        embed_batch(&embedder, &mut b, 0).await.unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.vector, y.vector);
        }
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_others_intact() {
        let embedder = FlakyEmbedder {
            inner: StubEmbedder { dims: 4 },
            calls: AtomicUsize::new(0),
            fail_on: 1,
        };

        let mut batches = batchify(make_chunks(6), 2);
        let mut failures = 0;
        for (i, batch) in batches.iter_mut().enumerate() {
            if embed_batch(&embedder, batch, i).await.is_err() {
                failures += 1;
            }
        }

        assert_eq!(failures, 1);
        assert!(batches[0].iter().all(|c| c.vector.is_some()));
        assert!(batches[1].iter().all(|c| c.vector.is_none()));
        assert!(batches[2].iter().all(|c| c.vector.is_some()));
    }

    #[tokio::test]
    async fn test_count_mismatch_fails_batch() {
        struct ShortEmbedder;

        #[async_trait]
        impl Embedder for ShortEmbedder {
            fn model_name(&self) -> &str {
                "short"
            }
            fn dims(&self) -> usize {
                2
            }
            async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(vec![vec![0.0, 1.0]])
            }
        }

        let mut batch = make_chunks(3);
        let err = embed_batch(&ShortEmbedder, &mut batch, 7).await.unwrap_err();
        assert_eq!(err.batch_index, 7);
        assert!(err.message.contains("expected 3 vectors"));
        assert!(batch.iter().all(|c| c.vector.is_none()));
    }
}
