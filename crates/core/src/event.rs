//! Pipeline events: structured checkpoints of a chat turn.
//!
//! The pipeline reports what happened at each stage to an injected
//! [`PipelineObserver`] instead of printing. Two observers ship here:
//! [`TracingObserver`] writes log records, [`EventBus`] fans events out
//! to any number of subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The stages of a chat turn, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FormatHistory,
    Condense,
    Retrieve,
    AssembleContext,
    GenerateAnswer,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FormatHistory => "format_history",
            Stage::Condense => "condense",
            Stage::Retrieve => "retrieve",
            Stage::AssembleContext => "assemble_context",
            Stage::GenerateAnswer => "generate_answer",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All checkpoint events emitted during a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A turn was accepted and history formatted
    TurnStarted {
        message: String,
        history_chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// The condenser produced a standalone question
    QueryCondensed {
        original: String,
        standalone: String,
        timestamp: DateTime<Utc>,
    },

    /// The index returned passages for the standalone question
    PassagesRetrieved {
        count: usize,
        sources: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Passages were joined into the context block
    ContextAssembled {
        passages: usize,
        chars: usize,
        estimated_tokens: usize,
        timestamp: DateTime<Utc>,
    },

    /// The generator returned an answer
    AnswerGenerated {
        chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A stage failed and the turn was aborted
    TurnFailed {
        stage: Stage,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// Receives pipeline checkpoints. Must not block.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Writes every checkpoint as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::TurnStarted { message, history_chars, .. } => {
                info!(message_chars = message.len(), history_chars, "chat turn started");
            }
            PipelineEvent::QueryCondensed { original, standalone, .. } => {
                info!(user_question = %original, standalone_question = %standalone, "query condensed");
            }
            PipelineEvent::PassagesRetrieved { count, sources, .. } => {
                info!(retrieved = count, ?sources, "passages retrieved");
            }
            PipelineEvent::ContextAssembled { passages, chars, estimated_tokens, .. } => {
                debug!(passages, context_chars = chars, estimated_tokens, "context assembled");
            }
            PipelineEvent::AnswerGenerated { chars, .. } => {
                debug!(answer_chars = chars, "answer generated");
            }
            PipelineEvent::TurnFailed { stage, error, .. } => {
                warn!(%stage, %error, "chat turn failed");
            }
        }
    }
}

/// A broadcast-based event bus for pipeline events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        // no subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl PipelineObserver for EventBus {
    fn on_event(&self, event: &PipelineEvent) {
        self.publish(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.on_event(&PipelineEvent::PassagesRetrieved {
            count: 2,
            sources: vec!["faq.pdf".into()],
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            PipelineEvent::PassagesRetrieved { count, sources, .. } => {
                assert_eq!(*count, 2);
                assert_eq!(sources[0], "faq.pdf");
            }
            _ => panic!("Expected PassagesRetrieved event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(PipelineEvent::TurnFailed {
            stage: Stage::Retrieve,
            error: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn stage_display_is_snake_case() {
        assert_eq!(Stage::AssembleContext.to_string(), "assemble_context");
        assert_eq!(
            serde_json::to_string(&Stage::GenerateAnswer).unwrap(),
            "\"generate_answer\""
        );
    }

    #[test]
    fn tracing_observer_accepts_every_event() {
        let observer = TracingObserver;
        let now = Utc::now();
        observer.on_event(&PipelineEvent::TurnStarted {
            message: "hi".into(),
            history_chars: 0,
            timestamp: now,
        });
        observer.on_event(&PipelineEvent::AnswerGenerated { chars: 5, timestamp: now });
    }
}
