//! The conversational retrieval pipeline.
//!
//! One chat turn runs five sequential stages:
//!
//! 1. [`history::format_history`] renders the caller's transcript
//! 2. [`QueryCondenser`] rewrites the message into a standalone question
//! 3. [`Retriever`] fetches the nearest passages from the vector index
//! 4. [`context::assemble_context`] joins them into one context block
//! 5. [`AnswerGenerator`] prompts the model with context, history and question
//!
//! [`ChatPipeline`] sequences them, applying a per-stage timeout and a
//! cancellation token, and reports checkpoints to its observers. No stage
//! keeps state between turns.

pub mod condenser;
pub mod context;
pub mod generator;
pub mod history;
pub mod orchestrator;
pub mod prompts;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use condenser::QueryCondenser;
pub use context::assemble_context;
pub use generator::{AnswerGenerator, Generator};
pub use history::format_history;
pub use orchestrator::{ChatPipeline, PipelineError, TurnInput, TurnResult};
pub use retriever::{DEFAULT_TOP_K, Retriever};
