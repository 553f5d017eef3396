//! Ingestion pipeline orchestration.
//!
//! Runs one pass over the input directory: per-file extraction
//! (skip-and-continue), splitting, batched embedding (per-batch
//! skip-and-continue), and persistence. Only store failures abort a run;
//! whatever was already upserted stays durable, with no rollback.
//!
//! Embedding and persistence are pipelined: while one batch's embedding
//! call is in flight, the previously embedded batch is being upserted.
//! Those two calls are the run's only suspension points.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::batch::{batchify, embed_batch};
use crate::chunk::{chunk_document, short_doc_id};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::extract::{doc_name, extract_document};
use crate::models::{Chunk, Document};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::{StoreError, VectorStore};
use crate::token::TokenSizer;

/// Stages of an ingestion run.
///
/// `Failed` is terminal and reachable only from unrecoverable store
/// errors; per-document and per-batch failures never leave their stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IngestStage {
    Idle,
    Setup,
    Extracting,
    Splitting,
    Embedding,
    Persisting,
    Done,
    Failed,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStage::Idle => "idle",
            IngestStage::Setup => "setup",
            IngestStage::Extracting => "extracting",
            IngestStage::Splitting => "splitting",
            IngestStage::Embedding => "embedding",
            IngestStage::Persisting => "persisting",
            IngestStage::Done => "done",
            IngestStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counts emitted by a run.
///
/// The report is how callers detect partial ingestion:
/// `chunks_embedded < chunks_created` means batches were lost, and
/// `documents_skipped > 0` means extraction failures. Nothing is dropped
/// silently.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub documents_found: usize,
    pub documents_extracted: usize,
    pub documents_skipped: usize,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub chunks_persisted: usize,
    pub batches_failed: usize,
}

/// Run one ingestion pass over the configured input directory.
///
/// Re-running over the same directory is idempotent: chunk ids are stable,
/// so previously ingested chunks are overwritten with identical content.
/// With `dry_run`, the store and the embedder are never called.
pub async fn run_ingest(
    config: &Config,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    reporter: &dyn ProgressReporter,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<IngestReport> {
    match ingest_inner(config, store, embedder, reporter, dry_run, limit).await {
        Ok(report) => Ok(report),
        Err(e) => {
            reporter.report(ProgressEvent::StageStarted {
                stage: IngestStage::Failed,
            });
            Err(e)
        }
    }
}

async fn ingest_inner(
    config: &Config,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    reporter: &dyn ProgressReporter,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    if !dry_run {
        reporter.report(ProgressEvent::StageStarted {
            stage: IngestStage::Setup,
        });
        store.setup().await.context("vector store setup failed")?;
    }

    reporter.report(ProgressEvent::StageStarted {
        stage: IngestStage::Extracting,
    });
    let mut files = discover_files(config)?;
    if let Some(lim) = limit {
        files.truncate(lim);
    }
    report.documents_found = files.len();
    reporter.report(ProgressEvent::DocumentsFound {
        count: files.len() as u64,
    });

    let mut docs: Vec<Document> = Vec::new();
    for path in &files {
        let name = doc_name(path);
        match extract_document(path) {
            Ok(text) => docs.push(Document {
                id: short_doc_id(&name),
                name,
                text,
            }),
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", path.display(), e);
                report.documents_skipped += 1;
            }
        }
    }
    report.documents_extracted = docs.len();
    reporter.report(ProgressEvent::Extracted {
        done: report.documents_extracted as u64,
        total: report.documents_found as u64,
        skipped: report.documents_skipped as u64,
    });

    reporter.report(ProgressEvent::StageStarted {
        stage: IngestStage::Splitting,
    });
    let mut chunks: Vec<Chunk> = Vec::new();
    for doc in &docs {
        chunks.extend(chunk_document(
            doc,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        ));
    }
    report.chunks_created = chunks.len();
    reporter.report(ProgressEvent::ChunksCreated {
        count: chunks.len() as u64,
    });

    // Chunk size distribution; informational only, never blocks the run.
    if !chunks.is_empty() {
        match TokenSizer::new() {
            Ok(sizer) => {
                if let Some(s) = sizer.summarize(chunks.iter().map(|c| c.text.as_str())) {
                    eprintln!(
                        "chunk sizes: min {} / max {} / avg {} tokens",
                        s.min, s.max, s.avg
                    );
                }
            }
            Err(e) => eprintln!("Warning: token sizer unavailable: {}", e),
        }
    }

    if dry_run || chunks.is_empty() {
        reporter.report(ProgressEvent::StageStarted {
            stage: IngestStage::Done,
        });
        return Ok(report);
    }

    reporter.report(ProgressEvent::StageStarted {
        stage: IngestStage::Embedding,
    });
    let total_chunks = chunks.len();
    let batches = batchify(chunks, config.embedding.batch_size);

    // Embedded chunks awaiting persistence. While batch N embeds, batch
    // N-1 is upserted; the two never touch the same chunks.
    let mut ready: Vec<Chunk> = Vec::new();

    for (batch_index, mut batch) in batches.into_iter().enumerate() {
        let to_persist = std::mem::take(&mut ready);
        let (embed_res, persist_res) = tokio::join!(
            embed_batch(embedder, &mut batch, batch_index),
            persist_batch(store, to_persist),
        );

        report.chunks_persisted += persist_res.context("vector store write failed")?;

        match embed_res {
            Ok(()) => {
                report.chunks_embedded += batch.len();
                ready = batch;
            }
            Err(e) => {
                eprintln!("Warning: {} ({} chunks dropped this run)", e, batch.len());
                report.batches_failed += 1;
            }
        }
        reporter.report(ProgressEvent::Embedded {
            done: report.chunks_embedded as u64,
            total: total_chunks as u64,
        });
    }

    reporter.report(ProgressEvent::StageStarted {
        stage: IngestStage::Persisting,
    });
    report.chunks_persisted += persist_batch(store, ready)
        .await
        .context("vector store write failed")?;
    reporter.report(ProgressEvent::Persisted {
        count: report.chunks_persisted as u64,
    });

    reporter.report(ProgressEvent::StageStarted {
        stage: IngestStage::Done,
    });
    Ok(report)
}

async fn persist_batch(store: &dyn VectorStore, chunks: Vec<Chunk>) -> Result<usize, StoreError> {
    if chunks.is_empty() {
        return Ok(0);
    }
    store.upsert(&chunks).await?;
    Ok(chunks.len())
}

/// Discover source files under the configured input directory, creating it
/// if absent. Results are sorted so runs are deterministic.
fn discover_files(config: &Config) -> Result<Vec<PathBuf>> {
    let dir = &config.docs.dir;
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create docs directory: {}", dir.display()))?;
    }

    let include_set = build_globset(&config.docs.include_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        if include_set.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
