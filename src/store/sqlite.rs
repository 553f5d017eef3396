//! SQLite-backed vector store.
//!
//! Vectors are stored as little-endian f32 BLOBs; similarity is computed
//! in Rust at query time, and exact-match lookups go through ordinary
//! indexes. Schema creation is idempotent.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use super::{StoreError, VectorStore};
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, RetrievedChunk};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `path` in WAL mode, creating file and parent
    /// directories if missing.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Total chunk count. Used by `dkt stats`.
    pub async fn chunk_count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    /// Distinct document count. Used by `dkt stats`.
    pub async fn document_count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(DISTINCT doc_name) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    /// Per-document chunk counts, largest first. Used by `dkt stats`.
    pub async fn doc_breakdown(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT doc_name, COUNT(*) AS chunk_count
            FROM chunks
            GROUP BY doc_name
            ORDER BY chunk_count DESC, doc_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("doc_name"), row.get("chunk_count")))
            .collect())
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Chunk {
    let blob: Vec<u8> = row.get("embedding");
    Chunk {
        chunk_id: row.get("chunk_id"),
        text: row.get("text"),
        doc_name: row.get("doc_name"),
        vector: Some(blob_to_vec(&blob)),
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn setup(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                doc_name TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dims INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_name ON chunks(doc_name)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        // Validate before the first write so a bad batch leaves no rows.
        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match &chunk.vector {
                Some(vector) => rows.push((chunk, vector)),
                None => {
                    return Err(StoreError::InvariantViolation(format!(
                        "chunk {} has no vector at persist time",
                        chunk.chunk_id
                    )))
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        for (chunk, vector) in rows {
            let blob = vec_to_blob(vector);

            sqlx::query(
                r#"
                INSERT INTO chunks (chunk_id, doc_name, text, embedding, dims, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    doc_name = excluded.doc_name,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    dims = excluded.dims,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.doc_name)
            .bind(&chunk.text)
            .bind(&blob)
            .bind(vector.len() as i64)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let rows = sqlx::query("SELECT chunk_id, doc_name, text, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut candidates: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                RetrievedChunk {
                    chunk_id: row.get("chunk_id"),
                    doc_name: row.get("doc_name"),
                    text: row.get("text"),
                    score: cosine_similarity(query_vec, &vec) as f64,
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
        let row =
            sqlx::query("SELECT chunk_id, doc_name, text, embedding FROM chunks WHERE chunk_id = ?")
                .bind(chunk_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(row.as_ref().map(row_to_chunk))
    }

    async fn chunks_for_doc(&self, doc_name: &str) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT chunk_id, doc_name, text, embedding FROM chunks WHERE doc_name = ? ORDER BY chunk_id",
        )
        .bind(doc_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(rows.iter().map(row_to_chunk).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, doc: &str, text: &str, vector: Option<Vec<f32>>) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            doc_name: doc.to_string(),
            vector,
        }
    }

    async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = SqliteStore::connect(&tmp.path().join("kb.sqlite"))
            .await
            .unwrap();
        store.setup().await.unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_setup_idempotent() {
        let (_tmp, store) = temp_store().await;
        store.setup().await.unwrap();
        store.setup().await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_get_roundtrip() {
        let (_tmp, store) = temp_store().await;
        let c = chunk("ab12cd34:0001", "case_1", "the suit parcel", Some(vec![0.5, 0.5]));
        store.upsert(&[c.clone()]).await.unwrap();

        let got = store.get("ab12cd34:0001").await.unwrap().unwrap();
        assert_eq!(got.text, "the suit parcel");
        assert_eq!(got.doc_name, "case_1");
        assert_eq!(got.vector, Some(vec![0.5, 0.5]));

        assert!(store.get("ab12cd34:0099").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let (_tmp, store) = temp_store().await;
        let first = chunk("ab12cd34:0001", "case_1", "old text", Some(vec![1.0, 0.0]));
        let second = chunk("ab12cd34:0001", "case_1", "new text", Some(vec![0.0, 1.0]));
        store.upsert(&[first]).await.unwrap();
        store.upsert(&[second]).await.unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 1);
        let got = store.get("ab12cd34:0001").await.unwrap().unwrap();
        assert_eq!(got.text, "new text");
    }

    #[tokio::test]
    async fn test_upsert_without_vector_is_invariant_violation() {
        let (_tmp, store) = temp_store().await;
        let good = chunk("ab12cd34:0001", "case_1", "a", Some(vec![1.0]));
        let bad = chunk("ab12cd34:0002", "case_1", "b", None);

        let err = store.upsert(&[good, bad]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
        // Nothing was written: validation happens before the first insert.
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_empty_store_returns_empty() {
        let (_tmp, store) = temp_store().await;
        let results = store.search(&[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let (_tmp, store) = temp_store().await;
        store
            .upsert(&[
                chunk("aa:0001", "case_1", "east", Some(vec![1.0, 0.0])),
                chunk("bb:0001", "case_2", "north", Some(vec![0.0, 1.0])),
                chunk("cc:0001", "case_3", "northeast", Some(vec![0.7, 0.7])),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, "aa:0001");
        assert_eq!(results[1].chunk_id, "cc:0001");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_search_ties_break_on_chunk_id() {
        let (_tmp, store) = temp_store().await;
        store
            .upsert(&[
                chunk("bb:0001", "case_2", "twin b", Some(vec![1.0, 0.0])),
                chunk("aa:0001", "case_1", "twin a", Some(vec![1.0, 0.0])),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].chunk_id, "aa:0001");
        assert_eq!(results[1].chunk_id, "bb:0001");
    }

    #[tokio::test]
    async fn test_chunks_for_doc_in_order() {
        let (_tmp, store) = temp_store().await;
        store
            .upsert(&[
                chunk("aa:0002", "case_1", "second", Some(vec![0.0])),
                chunk("aa:0001", "case_1", "first", Some(vec![0.0])),
                chunk("bb:0001", "case_2", "other", Some(vec![0.0])),
            ])
            .await
            .unwrap();

        let chunks = store.chunks_for_doc("case_1").await.unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["aa:0001", "aa:0002"]);

        assert!(store.chunks_for_doc("case_9").await.unwrap().is_empty());
    }
}
