//! Vector index implementations for RagDesk.
//!
//! Both backends embed chunk text through an injected
//! [`Embedder`](ragdesk_core::Embedder) and rank by cosine similarity.

pub mod embedder;
pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
pub(crate) mod test_embedder;

pub use embedder::ProviderEmbedder;
pub use in_memory::InMemoryIndex;
pub use vector::{cosine_similarity, rank_by_similarity};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteIndex;
