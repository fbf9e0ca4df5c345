//! SQLite backend with brute-force cosine search.
//!
//! Chunks live in a single `documents` table. Embeddings are stored as
//! little-endian f32 blobs and ranked in process at query time.

use crate::vector::{blob_to_embedding, embedding_to_blob, rank_by_similarity};
use async_trait::async_trait;
use ragdesk_core::error::IndexError;
use ragdesk_core::index::{Chunk, ChunkMetadata, Embedder, Passage, VectorIndex};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A persistent vector index stored in SQLite.
pub struct SqliteIndex {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteIndex {
    /// Open (or create) the index at `path`.
    ///
    /// Accepts a file path or a sqlx URL; pass `"sqlite::memory:"` for an
    /// ephemeral database.
    pub async fn new(path: &str, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| IndexError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| IndexError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let index = Self::from_pool(pool, embedder).await?;
        info!("SQLite vector index initialized at {path}");
        Ok(index)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let index = Self { pool, embedder };
        index.run_migrations().await?;
        Ok(index)
    }

    async fn run_migrations(&self) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT UNIQUE NOT NULL,
                content    TEXT NOT NULL,
                metadata   TEXT NOT NULL,
                embedding  BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("documents table: {e}")))?;

        Ok(())
    }

    fn row_to_stored(row: &sqlx::sqlite::SqliteRow) -> Result<(Chunk, Vec<f32>), IndexError> {
        let content: String = row
            .try_get("content")
            .map_err(|e| IndexError::QueryFailed(format!("content column: {e}")))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| IndexError::QueryFailed(format!("metadata column: {e}")))?;
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| IndexError::QueryFailed(format!("embedding column: {e}")))?;

        let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
            .map_err(|e| IndexError::QueryFailed(format!("metadata json: {e}")))?;

        Ok((Chunk { content, metadata }, blob_to_embedding(&blob)))
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>, IndexError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::Storage(format!("BEGIN failed: {e}")))?;

        let mut ids = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(&embeddings) {
            let id = Uuid::new_v4().to_string();
            let metadata_json = serde_json::to_string(&chunk.metadata)
                .map_err(|e| IndexError::Storage(format!("Metadata serialization: {e}")))?;

            sqlx::query("INSERT INTO documents (id, content, metadata, embedding) VALUES (?1, ?2, ?3, ?4)")
                .bind(&id)
                .bind(&chunk.content)
                .bind(&metadata_json)
                .bind(embedding_to_blob(embedding))
                .execute(&mut *tx)
                .await
                .map_err(|e| IndexError::Storage(format!("INSERT failed: {e}")))?;

            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| IndexError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(added = ids.len(), "Stored chunks in SQLite");
        Ok(ids)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, IndexError> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::EmbeddingFailed("no embedding for query".into()))?;

        let rows = sqlx::query("SELECT content, metadata, embedding FROM documents ORDER BY iid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("SELECT failed: {e}")))?;

        let stored = rows
            .iter()
            .map(Self::row_to_stored)
            .collect::<Result<Vec<_>, _>>()?;

        let ranked = rank_by_similarity(
            stored.iter().map(|(chunk, emb)| (chunk, emb.as_slice())),
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
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::Unavailable(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| IndexError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }

    async fn clear(&self) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_embedder::KeywordEmbedder;
    use ragdesk_core::index::SourceType;

    fn embedder() -> Arc<KeywordEmbedder> {
        Arc::new(KeywordEmbedder::new(vec!["hours", "refund", "shipping"]))
    }

    async fn test_index() -> SqliteIndex {
        SqliteIndex::new("sqlite::memory:", embedder()).await.unwrap()
    }

    fn chunk(file: &str, content: &str, index: usize) -> Chunk {
        Chunk {
            content: content.into(),
            metadata: ChunkMetadata {
                file_name: file.into(),
                source_type: SourceType::from_extension(file.rsplit('.').next().unwrap_or("")),
                chunk_index: index,
            },
        }
    }

    #[tokio::test]
    async fn store_and_search() {
        let index = test_index().await;
        let ids = index
            .add_chunks(vec![
                chunk("policy.pdf", "Refund requests are handled within 5 days.", 0),
                chunk("policy.pdf", "Shipping takes 3 days.", 1),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let results = index.search("how do refunds work", 6).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.starts_with("Refund"));
        assert_eq!(results[0].metadata.source_type, SourceType::Pdf);
        assert_eq!(results[0].metadata.file_name, "policy.pdf");
    }

    #[tokio::test]
    async fn search_respects_k() {
        let index = test_index().await;
        let chunks = (0..10)
            .map(|i| chunk("hours.txt", &format!("hours block {i}"), i))
            .collect();
        index.add_chunks(chunks).await.unwrap();
        assert_eq!(index.search("hours", 6).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn empty_index_returns_empty() {
        let index = test_index().await;
        assert!(index.search("hours", 6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_and_clear() {
        let index = test_index().await;
        assert_eq!(index.count().await.unwrap(), 0);
        index
            .add_chunks(vec![chunk("a.md", "one", 0), chunk("a.md", "two", 1)])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let path = path.to_string_lossy().to_string();

        {
            let index = SqliteIndex::new(&path, embedder()).await.unwrap();
            index
                .add_chunks(vec![chunk("faq.txt", "Opening hours are 9-5.", 0)])
                .await
                .unwrap();
        }

        let reopened = SqliteIndex::new(&path, embedder()).await.unwrap();
        let results = reopened.search("hours", 6).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.source_type, SourceType::Text);
    }
}
