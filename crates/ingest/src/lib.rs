//! Document ingestion for RagDesk.
//!
//! An upload flows through three steps: extract plain text
//! ([`extract`]), cut it into overlapping windows ([`splitter`]), and
//! hand the resulting chunks to the vector index.

pub mod extract;
pub mod splitter;

use async_trait::async_trait;
use ragdesk_core::error::IngestError;
use ragdesk_core::index::{Chunk, ChunkMetadata, SourceType, VectorIndex};
use ragdesk_core::ingest::{DocumentIngestor, IngestReport, UploadedFile};
use std::sync::Arc;
use tracing::{info, warn};

pub use extract::{DocumentKind, ExtractError, extract_text};
pub use splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, RecursiveCharacterSplitter};

/// Extracts, splits and indexes uploaded files.
pub struct Ingestor {
    index: Arc<dyn VectorIndex>,
    splitter: RecursiveCharacterSplitter,
}

impl Ingestor {
    pub fn new(index: Arc<dyn VectorIndex>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            index,
            splitter: RecursiveCharacterSplitter::new(chunk_size, chunk_overlap),
        }
    }

    /// Split already-extracted text into chunks carrying provenance.
    pub fn chunk_document(&self, file_name: &str, extension: &str, text: &str) -> Vec<Chunk> {
        let source_type = SourceType::from_extension(extension);
        self.splitter
            .split_text(text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                metadata: ChunkMetadata {
                    file_name: file_name.to_string(),
                    source_type: source_type.clone(),
                    chunk_index,
                },
            })
            .collect()
    }
}

#[async_trait]
impl DocumentIngestor for Ingestor {
    async fn ingest(&self, file: UploadedFile) -> Result<IngestReport, IngestError> {
        let extension = file.extension();
        let kind = DocumentKind::detect(file.mime_type.as_deref(), &extension);
        let file_name = file.file_name.clone();

        // PDF parsing is CPU-bound
        let text = tokio::task::spawn_blocking(move || extract_text(&file.bytes, kind))
            .await
            .map_err(|e| IngestError::Extraction {
                file_name: file_name.clone(),
                reason: format!("extraction task failed: {e}"),
            })?
            .map_err(|e| IngestError::Extraction {
                file_name: file_name.clone(),
                reason: e.to_string(),
            })?;

        let chunks = self.chunk_document(&file_name, &extension, &text);
        if chunks.is_empty() {
            warn!(file = %file_name, "No text extracted, nothing to index");
            return Ok(IngestReport::default());
        }

        let num_chunks = chunks.len();
        let inserted_ids = self.index.add_chunks(chunks).await?;

        info!(
            file = %file_name,
            kind = ?kind,
            chunks = num_chunks,
            index = self.index.name(),
            "Document ingested"
        );

        Ok(IngestReport {
            num_chunks,
            inserted_ids,
        })
    }
}
