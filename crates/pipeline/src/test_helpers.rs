//! Shared test doubles for pipeline tests.

use async_trait::async_trait;
use ragdesk_core::error::{IndexError, ProviderError};
use ragdesk_core::index::{Chunk, ChunkMetadata, Passage, SourceType, VectorIndex};
use ragdesk_core::message::Message;
use ragdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::time::Duration;

/// A provider that replies with scripted texts in order and records
/// every request it receives.
pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The prompt text of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.messages.into_iter().map(|m| m.content).collect::<Vec<_>>().join("\n"))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = self.responses.lock().unwrap().pop().ok_or_else(|| ProviderError::ApiError {
            status_code: 500,
            message: "ScriptedProvider: script exhausted".into(),
        })?;

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }
}

/// A provider whose every call fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// An index returning a fixed passage list, recording each query.
pub struct StubIndex {
    passages: Vec<Passage>,
    queries: Mutex<Vec<(String, usize)>>,
    unreachable: bool,
}

impl StubIndex {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            queries: Mutex::new(Vec::new()),
            unreachable: false,
        }
    }

    /// Every search fails as if the index were offline.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for StubIndex {
    fn name(&self) -> &str {
        "stub"
    }

    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>, IndexError> {
        Ok(chunks.iter().map(|_| String::new()).collect())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, IndexError> {
        self.queries.lock().unwrap().push((query.to_string(), k));
        if self.unreachable {
            return Err(IndexError::Unavailable("connection refused".into()));
        }
        // returns everything regardless of k
        Ok(self.passages.clone())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.passages.len())
    }

    async fn clear(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// A passage from `faq.txt` with the given content.
pub fn passage(content: &str) -> Passage {
    Passage {
        content: content.to_string(),
        metadata: ChunkMetadata {
            file_name: "faq.txt".into(),
            source_type: SourceType::Text,
            chunk_index: 0,
        },
        score: 0.5,
    }
}
