//! Retrieval of the passages nearest to a standalone question.

use ragdesk_core::error::IndexError;
use ragdesk_core::index::{Passage, VectorIndex};
use std::sync::Arc;
use tracing::debug;

/// Passages fetched per question.
pub const DEFAULT_TOP_K: usize = 6;

/// Read-only adapter over a [`VectorIndex`].
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    k: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.k
    }

    /// Up to `k` passages in the index's order. An empty index yields an
    /// empty list; an unreachable one is an error.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Passage>, IndexError> {
        let mut passages = self.index.search(question, self.k).await?;
        passages.truncate(self.k);
        debug!(index = self.index.name(), k = self.k, found = passages.len(), "Retrieved passages");
        Ok(passages)
    }
}
