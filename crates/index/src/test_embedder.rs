//! Deterministic embedder for index tests.

use async_trait::async_trait;
use ragdesk_core::error::IndexError;
use ragdesk_core::index::Embedder;
use std::sync::atomic::{AtomicBool, Ordering};

/// Embeds text as keyword counts over a fixed vocabulary.
///
/// Text sharing more vocabulary words with the query scores higher.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub fail: AtomicBool,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: Vec<&'static str>) -> Self {
        Self {
            vocabulary,
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IndexError::EmbeddingFailed("embedding service down".into()));
        }
        Ok(inputs
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                self.vocabulary
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}
