//! Overlapping-window text splitter.
//!
//! Splits a document's text into chunks of at most `chunk_size` word
//! tokens, with consecutive chunks sharing exactly `chunk_overlap` tokens
//! of trailing/leading context. Splitting is deterministic and lossless
//! over whitespace-normalized text: dropping each later chunk's leading
//! overlap and concatenating reconstructs the input.
//!
//! Chunk identifiers are stable across runs. The document id is derived
//! from a hash of the document name, and the sequence number is zero-padded
//! so ids sort in document order.

use sha2::{Digest, Sha256};

use crate::models::{Chunk, Document};

/// Short document identifier: the first 8 hex chars of SHA-256 of the
/// document name. Stable across runs, so re-ingesting the same corpus
/// overwrites chunks in place instead of appending duplicates.
pub fn short_doc_id(doc_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc_name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

/// Split text into overlapping windows of `chunk_size` word tokens.
///
/// Consecutive chunks share exactly `chunk_overlap` tokens; the final
/// chunk may be shorter. Text with at most `chunk_size` tokens yields one
/// chunk; empty or whitespace-only text yields none. Callers guarantee
/// `chunk_overlap < chunk_size` (configuration load validates it).
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    debug_assert!(chunk_overlap < chunk_size);

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= chunk_size {
        return vec![words.join(" ")];
    }

    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Split a document and mint chunk ids `{doc_id}:{seq:04}`, sequence
/// starting at 1.
pub fn chunk_document(doc: &Document, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    split_text(&doc.text, chunk_size, chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Chunk {
            chunk_id: format!("{}:{:04}", doc.id, idx + 1),
            text,
            doc_name: doc.name.clone(),
            vector: None,
        })
        .collect()
}
