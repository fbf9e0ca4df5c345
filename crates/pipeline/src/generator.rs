//! Completion client and answer generation.

use crate::prompts;
use ragdesk_core::error::ProviderError;
use ragdesk_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::debug;

/// A single-shot prompt-to-text client over a [`Provider`].
///
/// Cheap to clone; the condenser and the answer generator share one.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as one user message and return the raw reply text.
    pub async fn complete(&self, prompt: String) -> Result<String, ProviderError> {
        let mut request = ProviderRequest::from_prompt(&self.model, prompt);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                provider = self.provider.name(),
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }

        Ok(response.message.content)
    }
}

/// Produces the grounded answer for a turn.
#[derive(Clone)]
pub struct AnswerGenerator {
    generator: Generator,
}

impl AnswerGenerator {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// One model call with the grounded-answer prompt. The reply is
    /// returned as-is; grounding is instructed, not enforced.
    pub async fn generate(
        &self,
        context: &str,
        chat_history: &str,
        question: &str,
    ) -> Result<String, ProviderError> {
        let prompt = prompts::answer_prompt(context, chat_history, question);
        self.generator.complete(prompt).await
    }
}
