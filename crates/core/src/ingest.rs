//! Ingestion trait: the producer side of the vector index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::IngestError;

/// A file received from an upload or read from disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// The name the client gave the file (drives type detection)
    pub file_name: String,

    /// Declared MIME type, if the client sent one
    pub mime_type: Option<String>,

    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }
}

/// Outcome of ingesting one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Number of chunks written to the index
    pub num_chunks: usize,

    /// Ids the index assigned to the chunks (may be empty)
    pub inserted_ids: Vec<String>,
}

/// Turns an uploaded file into stored chunks.
#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    async fn ingest(&self, file: UploadedFile) -> std::result::Result<IngestReport, IngestError>;
}
