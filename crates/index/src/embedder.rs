//! Embedder backed by a text-generation provider's embeddings endpoint.

use async_trait::async_trait;
use ragdesk_core::error::IndexError;
use ragdesk_core::index::Embedder;
use ragdesk_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;
use tracing::debug;

/// Calls [`Provider::embed`] with a fixed embedding model.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, count = inputs.len(), "Embedding texts");

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: inputs.to_vec(),
            })
            .await
            .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != inputs.len() {
            return Err(IndexError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_core::error::ProviderError;
    use ragdesk_core::message::Message;
    use ragdesk_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    /// Returns `[len, 1.0]` per input, optionally dropping the last vector.
    struct LengthProvider {
        drop_last: bool,
    }

    #[async_trait]
    impl Provider for LengthProvider {
        fn name(&self) -> &str {
            "length"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(""),
                usage: None,
                model: request.model,
            })
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            let mut embeddings: Vec<Vec<f32>> = request
                .inputs
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect();
            if self.drop_last {
                embeddings.pop();
            }
            Ok(EmbeddingResponse {
                embeddings,
                model: request.model,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn embeds_in_input_order() {
        let embedder = ProviderEmbedder::new(
            Arc::new(LengthProvider { drop_last: false }),
            "text-embedding-3-small",
        );
        let vectors = embedder
            .embed(&["ab".to_string(), "abcd".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![2.0, 1.0], vec![4.0, 1.0]]);
        assert_eq!(embedder.name(), "length");
    }

    #[tokio::test]
    async fn count_mismatch_is_error() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthProvider { drop_last: true }), "m");
        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingFailed(_)));
    }

    #[tokio::test]
    async fn unsupported_provider_maps_to_embedding_failed() {
        struct NoEmbed;

        #[async_trait]
        impl Provider for NoEmbed {
            fn name(&self) -> &str {
                "no-embed"
            }
            async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::NotConfigured("unused".into()))
            }
        }

        let embedder = ProviderEmbedder::new(Arc::new(NoEmbed), "m");
        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("no-embed"));
    }

    #[tokio::test]
    async fn empty_input_skips_provider() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthProvider { drop_last: true }), "m");
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }
}
