//! Knowledge-base statistics.
//!
//! A quick summary of what's indexed: document and chunk counts, database
//! size, and a per-document breakdown. Used by `dkt stats` to confirm
//! ingestion runs landed what they reported.

use anyhow::Result;

use crate::config::Config;
use crate::store::SqliteStore;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config, store: &SqliteStore) -> Result<()> {
    let total_chunks = store.chunk_count().await?;
    let total_docs = store.document_count().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docket — Knowledge Base Stats");
    println!("=============================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Documents:  {}", total_docs);
    println!("  Chunks:     {}", total_chunks);

    let breakdown = store.doc_breakdown().await?;
    if !breakdown.is_empty() {
        println!();
        println!("  By document:");
        println!("  {:<44} {:>8}", "DOCUMENT", "CHUNKS");
        println!("  {}", "-".repeat(53));
        for (name, count) in &breakdown {
            println!("  {:<44} {:>8}", name, count);
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
