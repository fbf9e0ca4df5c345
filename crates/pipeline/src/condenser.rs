//! Query condensation: follow-up message to standalone question.

use crate::generator::Generator;
use crate::prompts;
use ragdesk_core::error::ProviderError;

/// Rewrites a user message into a self-contained question using the
/// conversation so far.
#[derive(Clone)]
pub struct QueryCondenser {
    generator: Generator,
}

impl QueryCondenser {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// One model call; the output is returned verbatim, even when empty.
    pub async fn condense(
        &self,
        chat_history: &str,
        message: &str,
    ) -> Result<String, ProviderError> {
        let prompt = prompts::condense_prompt(chat_history, message);
        self.generator.complete(prompt).await
    }
}
