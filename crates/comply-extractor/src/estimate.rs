//! Document size estimation
//!
//! A byte-length heuristic used only to pick an extraction strategy. It is
//! not a page count.

use crate::ExtractorConfig;
use serde::{Deserialize, Serialize};

/// Approximate size of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEstimate {
    /// Estimated pages, at least 1
    pub pages: usize,

    /// Estimated model tokens, at least 1
    pub tokens: usize,
}

impl SizeEstimate {
    /// Estimate from a byte length
    pub fn from_len(len: usize, bytes_per_page: usize, tokens_per_page: usize) -> Self {
        let pages = (len / bytes_per_page.max(1)).max(1);
        let tokens = pages.saturating_mul(tokens_per_page).max(1);
        Self { pages, tokens }
    }
}

/// Estimate the size of a document using the configured constants
pub fn estimate(document: &[u8], config: &ExtractorConfig) -> SizeEstimate {
    SizeEstimate::from_len(document.len(), config.bytes_per_page, config.tokens_per_page)
}
