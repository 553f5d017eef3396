//! Token-length measurement for chunk-size diagnostics.
//!
//! Token counts feed the min/max/average chunk size report and nothing
//! else. A sizer that fails to load degrades to a warning upstream; it is
//! never allowed to block ingestion.

use anyhow::Result;
use tiktoken_rs::CoreBPE;

pub struct TokenSizer {
    bpe: CoreBPE,
}

impl TokenSizer {
    /// Load the cl100k_base encoding. Loading is the only fallible step.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()?;
        Ok(Self { bpe })
    }

    /// Number of tokens in `text`. Deterministic, no side effects.
    pub fn token_size(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Min/max/average token size over a set of texts. `None` when empty.
    pub fn summarize<'a, I>(&self, texts: I) -> Option<SizeSummary>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let sizes: Vec<usize> = texts.into_iter().map(|t| self.token_size(t)).collect();
        let min = sizes.iter().min().copied()?;
        let max = sizes.iter().max().copied()?;
        let avg = (sizes.iter().sum::<usize>() as f64 / sizes.len() as f64).round() as usize;
        Some(SizeSummary { min, max, avg })
    }
}

/// Chunk size distribution printed after the splitting stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSummary {
    pub min: usize,
    pub max: usize,
    pub avg: usize,
}
