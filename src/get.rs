//! Exact-match lookups.
//!
//! Fetches one chunk by id, or all of a document's chunks in order. Used
//! by the `dkt get` CLI command.

use anyhow::{bail, Result};

use crate::models::Chunk;
use crate::store::VectorStore;

pub async fn run_get(
    store: &dyn VectorStore,
    chunk_id: Option<&str>,
    doc: Option<&str>,
) -> Result<()> {
    match (chunk_id, doc) {
        (Some(id), _) => match store.get(id).await? {
            Some(chunk) => print_chunk(&chunk),
            None => bail!("chunk not found: {}", id),
        },
        (None, Some(name)) => {
            let chunks = store.chunks_for_doc(name).await?;
            if chunks.is_empty() {
                bail!("document not found: {}", name);
            }
            println!("{}: {} chunks", name, chunks.len());
            println!();
            for chunk in &chunks {
                print_chunk(chunk);
            }
        }
        (None, None) => bail!("provide a chunk id or --doc <name>"),
    }
    Ok(())
}

fn print_chunk(chunk: &Chunk) {
    println!("chunk: {}", chunk.chunk_id);
    println!("document: {}", chunk.doc_name);
    if let Some(vector) = &chunk.vector {
        println!("dims: {}", vector.len());
    }
    println!();
    println!("{}", chunk.text);
    println!();
}
