//! # RagDesk Core
//!
//! Domain types, traits, and error definitions for the RagDesk
//! retrieval-augmented chat service. No HTTP, storage or model client
//! code lives here; this is the domain model the other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here:
//! - [`Provider`]: the text-generation (and embedding) service
//! - [`VectorIndex`]: the similarity-search service over stored chunks
//! - [`Embedder`]: turns text into vectors for the index
//! - [`DocumentIngestor`]: turns an uploaded file into indexed chunks
//! - [`PipelineObserver`]: receives checkpoint events from a chat turn
//!
//! Implementations live in their respective crates and are injected at
//! startup, so tests can substitute stubs without global state.

pub mod error;
pub mod event;
pub mod index;
pub mod ingest;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IndexError, IngestError, ProviderError, Result};
pub use event::{EventBus, PipelineEvent, PipelineObserver, Stage, TracingObserver};
pub use index::{Chunk, ChunkMetadata, Embedder, Passage, SourceType, VectorIndex};
pub use ingest::{DocumentIngestor, IngestReport, UploadedFile};
pub use message::{HistoryInput, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
