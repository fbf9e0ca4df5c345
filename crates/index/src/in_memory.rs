//! In-memory backend: useful for testing and single-process deployments.

use crate::vector::rank_by_similarity;
use async_trait::async_trait;
use ragdesk_core::error::IndexError;
use ragdesk_core::index::{Chunk, Embedder, Passage, VectorIndex};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// An index that keeps chunks and their embeddings in a Vec.
/// Contents are lost when the process exits.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredChunk>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>, IndexError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let mut ids = Vec::with_capacity(chunks.len());
        let mut entries = self.entries.write().await;
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            ids.push(Uuid::new_v4().to_string());
            entries.push(StoredChunk { chunk, embedding });
        }

        debug!(added = ids.len(), total = entries.len(), "Stored chunks in memory");
        Ok(ids)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, IndexError> {
        if k == 0 || self.entries.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::EmbeddingFailed("no embedding for query".into()))?;

        let entries = self.entries.read().await;
        let ranked = rank_by_similarity(
            entries.iter().map(|e| (&e.chunk, e.embedding.as_slice())),
            &query_embedding,
            k,
        );

        Ok(ranked
            .into_iter()
            .map(|(chunk, score)| Passage {
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<(), IndexError> {
        self.entries.write().await.clear();
        Ok(())
    }
}
