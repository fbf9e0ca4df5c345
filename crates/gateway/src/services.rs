//! Startup wiring: turns an [`AppConfig`] into the shared collaborators
//! every entry point (HTTP server, `ask`, `ingest`) runs against.

use ragdesk_config::AppConfig;
use ragdesk_core::error::IndexError;
use ragdesk_core::index::{Embedder, VectorIndex};
use ragdesk_core::ingest::DocumentIngestor;
use ragdesk_index::{InMemoryIndex, ProviderEmbedder, SqliteIndex};
use ragdesk_ingest::Ingestor;
use ragdesk_pipeline::{ChatPipeline, Generator, Retriever};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("No provider registered under {0:?}; add a [providers.{0}] table or set an API key")]
    MissingProvider(String),

    #[error("Failed to create index directory {path}: {reason}")]
    IndexDirectory { path: String, reason: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// The collaborators built once at startup and shared by every request.
#[derive(Clone)]
pub struct Services {
    pub pipeline: Arc<ChatPipeline>,
    pub ingestor: Arc<dyn DocumentIngestor>,
    pub index: Arc<dyn VectorIndex>,
}

impl Services {
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let providers = ragdesk_providers::build_from_config(config);
        let provider = providers
            .default()
            .ok_or_else(|| StartupError::MissingProvider(config.default_provider.clone()))?;
        let embedding_provider = providers
            .get(config.embedding_provider())
            .ok_or_else(|| StartupError::MissingProvider(config.embedding_provider().to_string()))?;

        let embedder: Arc<dyn Embedder> = Arc::new(ProviderEmbedder::new(
            embedding_provider,
            &config.embedding.model,
        ));
        let index = open_index(config, embedder).await?;

        let generator = Generator::new(provider, &config.generation.model)
            .with_temperature(config.generation.temperature)
            .with_max_tokens(config.generation.max_tokens);
        let retriever = Retriever::new(index.clone()).with_top_k(config.retrieval.top_k);
        let pipeline = ChatPipeline::from_parts(generator, retriever)
            .with_stage_timeout(Duration::from_secs(config.pipeline.stage_timeout_secs));

        let ingestor = Ingestor::new(
            index.clone(),
            config.ingest.chunk_size,
            config.ingest.chunk_overlap,
        );

        info!(
            provider = %config.default_provider,
            model = %config.generation.model,
            index = index.name(),
            top_k = config.retrieval.top_k,
            "Services ready"
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            ingestor: Arc::new(ingestor),
            index,
        })
    }
}

async fn open_index(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn VectorIndex>, StartupError> {
    match config.index.backend.as_str() {
        "sqlite" => {
            let path = config.index.sqlite_path();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StartupError::IndexDirectory {
                        path: parent.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
            }
            let index = SqliteIndex::new(&path.to_string_lossy(), embedder).await?;
            Ok(Arc::new(index))
        }
        // validation only admits "memory" otherwise
        _ => Ok(Arc::new(InMemoryIndex::new(embedder))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds_memory_services() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".into());

        let services = Services::from_config(&config).await.unwrap();
        assert_eq!(services.index.name(), "in_memory");
        assert_eq!(services.index.count().await.unwrap(), 0);
        assert_eq!(services.pipeline.stage_timeout(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn sqlite_backend_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.index.backend = "sqlite".into();
        config.index.path = Some(dir.path().join("nested/index.db").to_string_lossy().into_owned());

        let services = Services::from_config(&config).await.unwrap();
        assert_eq!(services.index.name(), "sqlite");
        assert!(dir.path().join("nested/index.db").exists());
    }
}
