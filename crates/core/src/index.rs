//! Vector index trait: similarity search over ingested document chunks.
//!
//! Ingestion produces [`Chunk`]s once; the index owns them after
//! insertion. Retrieval returns [`Passage`]s ordered by descending
//! similarity with no minimum-score filter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::IndexError;

/// The kind of document a chunk was cut from.
///
/// Derived from the upload's file extension; unknown extensions are kept
/// verbatim so provenance is never lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    Pdf,
    Docx,
    Text,
    Markdown,
    Other(String),
}

impl SourceType {
    /// Classify a lower- or mixed-case extension, with or without the dot.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "pdf" => SourceType::Pdf,
            "docx" => SourceType::Docx,
            "txt" | "text" => SourceType::Text,
            "md" | "markdown" => SourceType::Markdown,
            _ => SourceType::Other(ext),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Docx => "docx",
            SourceType::Text => "txt",
            SourceType::Markdown => "md",
            SourceType::Other(ext) => ext,
        }
    }
}

impl From<String> for SourceType {
    fn from(s: String) -> Self {
        SourceType::from_extension(&s)
    }
}

impl From<SourceType> for String {
    fn from(t: SourceType) -> Self {
        t.as_str().to_string()
    }
}

/// Provenance attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Original upload file name
    pub file_name: String,

    /// Document type, from the file extension
    pub source_type: SourceType,

    /// Position of the chunk within its document, starting at 0
    pub chunk_index: usize,
}

/// A bounded slice of a document's text, ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub metadata: ChunkMetadata,

    /// Similarity to the query as computed by the index (higher is closer)
    #[serde(default)]
    pub score: f32,
}

impl From<Chunk> for Passage {
    fn from(chunk: Chunk) -> Self {
        Self {
            content: chunk.content,
            metadata: chunk.metadata,
            score: 0.0,
        }
    }
}

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Embed each input; the result has one vector per input, in order.
    async fn embed(&self, inputs: &[String]) -> std::result::Result<Vec<Vec<f32>>, IndexError>;
}

/// The core VectorIndex trait.
///
/// Implementations: in-memory, SQLite.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The backend name (e.g., "in_memory", "sqlite").
    fn name(&self) -> &str;

    /// Embed and store chunks. Returns the generated ids in input order.
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> std::result::Result<Vec<String>, IndexError>;

    /// Return up to `k` passages ordered by descending similarity to `query`.
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<Passage>, IndexError>;

    /// Get total chunk count.
    async fn count(&self) -> std::result::Result<usize, IndexError>;

    /// Remove every stored chunk.
    async fn clear(&self) -> std::result::Result<(), IndexError>;
}
