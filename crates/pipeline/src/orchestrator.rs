//! The chat-turn orchestrator.
//!
//! `format history -> condense -> retrieve -> assemble -> generate`, each
//! external call bounded by the stage timeout and raced against the
//! turn's cancellation token. The first failure aborts the turn.

use crate::condenser::QueryCondenser;
use crate::context::{assemble_context, estimate_tokens};
use crate::generator::{AnswerGenerator, Generator};
use crate::history::{format_history, format_messages, strip_current_message};
use crate::retriever::Retriever;
use chrono::Utc;
use ragdesk_core::event::{PipelineEvent, PipelineObserver, Stage, TracingObserver};
use ragdesk_core::index::{Passage, VectorIndex};
use ragdesk_core::message::HistoryInput;
use ragdesk_core::provider::Provider;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// One chat turn as the caller supplies it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnInput {
    /// The new user message
    pub message: String,

    /// The conversation so far; absent means a fresh conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryInput>,
}

impl TurnInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: None,
        }
    }

    pub fn with_history(mut self, history: impl Into<HistoryInput>) -> Self {
        self.history = Some(history.into());
        self
    }

    /// Reject input the pipeline cannot run on.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.message.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "message must be a non-empty string".into(),
            ));
        }
        Ok(())
    }

    /// The history as prompt text, without a trailing copy of `message`.
    pub fn formatted_history(&self) -> String {
        match &self.history {
            Some(history) => match history.messages() {
                Some(messages) => format_messages(strip_current_message(messages, &self.message)),
                None => format_history(Some(history)),
            },
            None => String::new(),
        }
    }
}

/// The outcome of a successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    /// The model's answer, unmodified
    pub answer: String,

    /// What was actually searched for
    pub standalone_question: String,

    /// What the answer was grounded on, in retrieval order
    pub passages: Vec<Passage>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stage {stage} failed: {source}")]
    Failed {
        stage: Stage,
        #[source]
        source: ragdesk_core::Error,
    },

    #[error("Stage {stage} timed out after {after:?}")]
    TimedOut { stage: Stage, after: Duration },

    #[error("Turn cancelled during {stage}")]
    Cancelled { stage: Stage },
}

impl PipelineError {
    /// The stage that failed, if the turn got that far.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidInput(_) => None,
            PipelineError::Failed { stage, .. }
            | PipelineError::TimedOut { stage, .. }
            | PipelineError::Cancelled { stage } => Some(*stage),
        }
    }
}

/// Runs chat turns. Holds only immutable collaborators, so one instance
/// serves any number of concurrent turns.
pub struct ChatPipeline {
    condenser: QueryCondenser,
    retriever: Retriever,
    answerer: AnswerGenerator,
    observers: Vec<Arc<dyn PipelineObserver>>,
    stage_timeout: Duration,
}

impl ChatPipeline {
    /// A pipeline with default sampling, `k = 6` and a tracing observer.
    pub fn new(
        provider: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        model: impl Into<String>,
    ) -> Self {
        Self::from_parts(Generator::new(provider, model), Retriever::new(index))
    }

    /// Build from a configured generator and retriever.
    pub fn from_parts(generator: Generator, retriever: Retriever) -> Self {
        Self {
            condenser: QueryCondenser::new(generator.clone()),
            retriever,
            answerer: AnswerGenerator::new(generator),
            observers: vec![Arc::new(TracingObserver)],
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Add an observer; the tracing observer stays registered.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn stage_timeout(&self) -> Duration {
        self.stage_timeout
    }

    /// Run one turn that cannot be cancelled from outside.
    pub async fn run(&self, input: TurnInput) -> Result<TurnResult, PipelineError> {
        self.run_with_cancel(input, &CancellationToken::new()).await
    }

    /// Run one turn, aborting at the next stage boundary or mid-call
    /// once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        input: TurnInput,
        cancel: &CancellationToken,
    ) -> Result<TurnResult, PipelineError> {
        input.validate()?;

        let chat_history = input.formatted_history();
        self.emit(PipelineEvent::TurnStarted {
            message: input.message.clone(),
            history_chars: chat_history.len(),
            timestamp: Utc::now(),
        });

        let standalone = self
            .stage(
                Stage::Condense,
                cancel,
                self.condenser.condense(&chat_history, &input.message),
            )
            .await?;
        self.emit(PipelineEvent::QueryCondensed {
            original: input.message.clone(),
            standalone: standalone.clone(),
            timestamp: Utc::now(),
        });

        let passages = self
            .stage(Stage::Retrieve, cancel, self.retriever.retrieve(&standalone))
            .await?;
        self.emit(PipelineEvent::PassagesRetrieved {
            count: passages.len(),
            sources: passages.iter().map(|p| p.metadata.file_name.clone()).collect(),
            timestamp: Utc::now(),
        });

        let context = assemble_context(&passages);
        self.emit(PipelineEvent::ContextAssembled {
            passages: passages.len(),
            chars: context.len(),
            estimated_tokens: estimate_tokens(&context),
            timestamp: Utc::now(),
        });

        let answer = self
            .stage(
                Stage::GenerateAnswer,
                cancel,
                self.answerer.generate(&context, &chat_history, &standalone),
            )
            .await?;
        self.emit(PipelineEvent::AnswerGenerated {
            chars: answer.len(),
            timestamp: Utc::now(),
        });

        info!(passages = passages.len(), answer_len = answer.len(), "Chat turn complete");

        Ok(TurnResult {
            answer,
            standalone_question: standalone,
            passages,
        })
    }

    /// Await one external call under the stage timeout and the token.
    async fn stage<T, E>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        work: impl Future<Output = Result<T, E>>,
    ) -> Result<T, PipelineError>
    where
        E: Into<ragdesk_core::Error>,
    {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
            result = tokio::time::timeout(self.stage_timeout, work) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(PipelineError::Failed { stage, source: e.into() }),
                Err(_) => Err(PipelineError::TimedOut { stage, after: self.stage_timeout }),
            },
        };

        if let Err(e) = &outcome {
            self.emit(PipelineEvent::TurnFailed {
                stage,
                error: e.to_string(),
                timestamp: Utc::now(),
            });
        }

        outcome
    }

    fn emit(&self, event: PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, ScriptedProvider, StubIndex, passage};
    use ragdesk_core::error::{IndexError, ProviderError};
    use ragdesk_core::event::EventBus;
    use ragdesk_core::message::Message;

    fn pipeline(provider: Arc<ScriptedProvider>, index: Arc<StubIndex>) -> ChatPipeline {
        ChatPipeline::new(provider, index, "gpt-4o-mini")
    }

    #[tokio::test]
    async fn full_turn_threads_values_through_stages() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "What are your business hours?",
            "We are open 9-5, Monday to Friday.",
        ]));
        let index = Arc::new(StubIndex::new(vec![passage("We are open 9-5 Mon-Fri.")]));

        let result = pipeline(provider.clone(), index.clone())
            .run(TurnInput::new("hours?"))
            .await
            .unwrap();

        assert_eq!(result.answer, "We are open 9-5, Monday to Friday.");
        assert_eq!(result.standalone_question, "What are your business hours?");
        assert_eq!(result.passages.len(), 1);

        // retrieval uses the standalone question, not the raw message
        assert_eq!(
            index.queries(),
            vec![("What are your business hours?".to_string(), 6)]
        );

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("User Message: hours?"));
        assert!(prompts[1].contains("Context:\nWe are open 9-5 Mon-Fri."));
        assert!(prompts[1].contains("Question: What are your business hours?"));
    }

    #[tokio::test]
    async fn history_reaches_both_prompts_once() {
        let provider = Arc::new(ScriptedProvider::new(vec!["Where is order 12345?", "Shipped."]));
        let index = Arc::new(StubIndex::new(vec![]));

        let history = vec![
            Message::user("I need help with my order"),
            Message::assistant("Sure, what's your order number?"),
            Message::user("12345"),
        ];
        pipeline(provider.clone(), index)
            .run(TurnInput::new("12345").with_history(history))
            .await
            .unwrap();

        let expected = "user: I need help with my order\nassistant: Sure, what's your order number?";
        let prompts = provider.prompts();
        assert!(prompts[0].contains(&format!("Chat History:\n{expected}\n\nUser Message: 12345")));
        assert!(prompts[1].contains(&format!("Chat History:\n{expected}\n\nQuestion:")));
    }

    #[tokio::test]
    async fn condense_failure_aborts_turn() {
        let index = Arc::new(StubIndex::new(vec![passage("p")]));
        let pipeline = ChatPipeline::new(Arc::new(FailingProvider), index.clone(), "m");

        let err = pipeline.run(TurnInput::new("hi")).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Condense));
        assert!(matches!(
            err,
            PipelineError::Failed {
                source: ragdesk_core::Error::Provider(ProviderError::Network(_)),
                ..
            }
        ));
        assert!(index.queries().is_empty());
    }

    #[tokio::test]
    async fn retrieval_failure_skips_generation() {
        let provider = Arc::new(ScriptedProvider::new(vec!["q", "never"]));
        let err = pipeline(provider.clone(), Arc::new(StubIndex::unreachable()))
            .run(TurnInput::new("hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Failed {
                stage: Stage::Retrieve,
                source: ragdesk_core::Error::Index(IndexError::Unavailable(_)),
            }
        ));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_retrieval_is_not_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "What is the meaning of life?",
            "I'm not sure. Would you like to chat with a live agent?",
        ]));
        let result = pipeline(provider.clone(), Arc::new(StubIndex::new(vec![])))
            .run(TurnInput::new("What's the meaning of life?"))
            .await
            .unwrap();

        assert!(result.passages.is_empty());
        assert!(provider.prompts()[1].contains("Context:\n\n\nChat History:"));
    }

    #[tokio::test]
    async fn empty_message_rejected_before_any_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = pipeline(provider.clone(), Arc::new(StubIndex::new(vec![])))
            .run(TurnInput::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(err.stage(), None);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stage_times_out() {
        let provider = Arc::new(
            ScriptedProvider::new(vec!["q", "a"]).with_delay(Duration::from_secs(5)),
        );
        let err = pipeline(provider, Arc::new(StubIndex::new(vec![])))
            .with_stage_timeout(Duration::from_millis(100))
            .run(TurnInput::new("hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::TimedOut {
                stage: Stage::Condense,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_call() {
        let provider = Arc::new(ScriptedProvider::new(vec!["q", "a"]));
        let token = CancellationToken::new();
        token.cancel();

        let err = pipeline(provider.clone(), Arc::new(StubIndex::new(vec![])))
            .run_with_cancel(TurnInput::new("hi"), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { stage: Stage::Condense }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_in_flight_call() {
        let provider = Arc::new(
            ScriptedProvider::new(vec!["q", "a"]).with_delay(Duration::from_secs(5)),
        );
        let pipeline = pipeline(provider, Arc::new(StubIndex::new(vec![])));
        let token = CancellationToken::new();

        let (result, _) = tokio::join!(pipeline.run_with_cancel(TurnInput::new("hi"), &token), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert!(matches!(
            result,
            Err(PipelineError::Cancelled { stage: Stage::Condense })
        ));
    }

    #[tokio::test]
    async fn observers_see_every_checkpoint() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let provider = Arc::new(ScriptedProvider::new(vec!["q", "a"]));

        pipeline(provider, Arc::new(StubIndex::new(vec![passage("A"), passage("B")])))
            .with_observer(bus.clone())
            .run(TurnInput::new("hi"))
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                PipelineEvent::TurnStarted { .. } => "started",
                PipelineEvent::QueryCondensed { .. } => "condensed",
                PipelineEvent::PassagesRetrieved { count, .. } => {
                    assert_eq!(*count, 2);
                    "retrieved"
                }
                PipelineEvent::ContextAssembled { chars, .. } => {
                    assert_eq!(*chars, "A\n\nB".len());
                    "assembled"
                }
                PipelineEvent::AnswerGenerated { .. } => "answered",
                PipelineEvent::TurnFailed { .. } => "failed",
            });
        }
        assert_eq!(kinds, vec!["started", "condensed", "retrieved", "assembled", "answered"]);
    }

    #[tokio::test]
    async fn failure_is_reported_to_observers() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();

        let _ = ChatPipeline::new(Arc::new(FailingProvider), Arc::new(StubIndex::new(vec![])), "m")
            .with_observer(bus.clone())
            .run(TurnInput::new("hi"))
            .await;

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        match last.as_deref() {
            Some(PipelineEvent::TurnFailed { stage, error, .. }) => {
                assert_eq!(*stage, Stage::Condense);
                assert!(error.contains("connection refused"));
            }
            other => panic!("expected TurnFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn turns_share_no_state() {
        let provider = Arc::new(ScriptedProvider::new(vec!["q1", "a1", "q2", "a2"]));
        let pipeline = pipeline(provider.clone(), Arc::new(StubIndex::new(vec![])));

        pipeline.run(TurnInput::new("first question")).await.unwrap();
        pipeline.run(TurnInput::new("second question")).await.unwrap();

        let prompts = provider.prompts();
        assert!(!prompts[2].contains("first question"));
        assert!(!prompts[3].contains("a1"));
    }

    #[test]
    fn turn_input_deserializes_all_history_shapes() {
        let list: TurnInput = serde_json::from_str(
            r#"{"message": "12345", "history": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(list.formatted_history(), "user: hi");

        let wrapped: TurnInput = serde_json::from_str(
            r#"{"message": "x", "history": {"messages": [{"role": "assistant", "content": "hello"}]}}"#,
        )
        .unwrap();
        assert_eq!(wrapped.formatted_history(), "assistant: hello");

        let text: TurnInput =
            serde_json::from_str(r#"{"message": "x", "history": "user: earlier"}"#).unwrap();
        assert_eq!(text.formatted_history(), "user: earlier");

        let absent: TurnInput = serde_json::from_str(r#"{"message": "x"}"#).unwrap();
        assert_eq!(absent.formatted_history(), "");

        assert!(serde_json::from_str::<TurnInput>(r#"{"message": "x", "history": 42}"#).is_err());
    }
}
