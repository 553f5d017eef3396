//! # docket CLI (`dkt`)
//!
//! The `dkt` binary is the primary interface for docket. It provides
//! commands for vector store initialization, document ingestion, semantic
//! retrieval, exact lookups, and knowledge-base statistics.
//!
//! ## Usage
//!
//! ```bash
//! dkt --config ./config/docket.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dkt init` | Create the SQLite vector store and its schema |
//! | `dkt ingest` | Extract, chunk, embed, and persist documents |
//! | `dkt query "<text>"` | Retrieve the chunks most similar to a query |
//! | `dkt get <chunk_id>` | Look up a chunk by id |
//! | `dkt stats` | Show what's indexed |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the vector store
//! dkt init --config ./config/docket.toml
//!
//! # Ingest everything in the configured docs directory
//! dkt ingest --config ./config/docket.toml
//!
//! # See what an ingest would do, without writing
//! dkt ingest --dry-run
//!
//! # Retrieve grounding context for a question
//! dkt query "compensation for compulsory land acquisition" --k 8
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docket::{config, embedding, get, ingest, progress, search, stats, store};
use docket::store::VectorStore;

/// docket CLI: a document-to-vector ingestion and retrieval pipeline for
/// legal knowledge bases.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docket.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dkt",
    about = "docket — a document-to-vector ingestion and retrieval pipeline for legal knowledge bases",
    version,
    long_about = "docket ingests legal documents deposited into an input directory, splits them \
    into overlapping token-bounded chunks, embeds the chunks in fixed-size batches, and persists \
    them to a vector store that serves nearest-neighbor retrieval for an answer-generation layer."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docket.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector store schema.
    ///
    /// Creates the SQLite database file and the chunks table/indexes.
    /// This command is idempotent; running it multiple times is safe.
    Init,

    /// Ingest documents from the configured input directory.
    ///
    /// Extracts text per document (skipping unreadable or empty ones),
    /// splits it into overlapping chunks, embeds the chunks in batches,
    /// and upserts them into the vector store. Re-running over the same
    /// directory overwrites chunks in place.
    Ingest {
        /// Scan, extract, and split without touching the store.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress output on stderr: off, human, or json.
        /// Defaults to human when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Retrieve the chunks most similar to a query.
    ///
    /// Embeds the query text and runs a nearest-neighbor search, printing
    /// ranked results with scores, excerpts, and chunk ids.
    Query {
        /// The query text.
        text: String,

        /// Number of results to return.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Look up a chunk by id, or a document's chunks with --doc.
    Get {
        /// Chunk id (`{doc_id}:{seq}`).
        chunk_id: Option<String>,

        /// Document name: print all of its chunks in order.
        #[arg(long)]
        doc: Option<String>,
    },

    /// Show knowledge-base statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = store::SqliteStore::connect(&cfg.db.path).await?;
            let result = store.setup().await;
            store.close().await;
            result?;
            println!("Vector store initialized successfully.");
        }
        Commands::Ingest {
            dry_run,
            limit,
            progress,
        } => {
            let mode = match progress.as_deref() {
                None => progress::ProgressMode::default_for_tty(),
                Some("off") => progress::ProgressMode::Off,
                Some("human") => progress::ProgressMode::Human,
                Some("json") => progress::ProgressMode::Json,
                Some(other) => bail!("Unknown progress mode: {}. Use off, human, or json.", other),
            };
            let reporter = mode.reporter();

            let store = store::SqliteStore::connect(&cfg.db.path).await?;
            let embedder = embedding::create_embedder(&cfg.embedding)?;

            let result = ingest::run_ingest(
                &cfg,
                &store,
                embedder.as_ref(),
                reporter.as_ref(),
                dry_run,
                limit,
            )
            .await;
            store.close().await;
            let report = result?;

            if dry_run {
                println!("ingest (dry-run)");
            } else {
                println!("ingest");
            }
            println!("  documents found: {}", report.documents_found);
            println!("  documents extracted: {}", report.documents_extracted);
            println!("  extraction skipped: {}", report.documents_skipped);
            println!("  chunks created: {}", report.chunks_created);
            if !dry_run {
                println!("  chunks embedded: {}", report.chunks_embedded);
                println!("  chunks persisted: {}", report.chunks_persisted);
                if report.batches_failed > 0 {
                    println!("  embedding batches failed: {}", report.batches_failed);
                }
            }
            println!("ok");
        }
        Commands::Query { text, k } => {
            let store = store::SqliteStore::connect(&cfg.db.path).await?;
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let result = search::run_query(&cfg, &store, embedder.as_ref(), &text, k).await;
            store.close().await;
            result?;
        }
        Commands::Get { chunk_id, doc } => {
            let store = store::SqliteStore::connect(&cfg.db.path).await?;
            let result = get::run_get(&store, chunk_id.as_deref(), doc.as_deref()).await;
            store.close().await;
            result?;
        }
        Commands::Stats => {
            let store = store::SqliteStore::connect(&cfg.db.path).await?;
            let result = stats::run_stats(&cfg, &store).await;
            store.close().await;
            result?;
        }
    }

    Ok(())
}
