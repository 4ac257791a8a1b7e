//! Meditation - stream-of-consciousness simulator
//!
//! Drives a generative text API in a loop: the whole stream of consciousness
//! so far is the prompt, the model's next thought is appended, and the final
//! stream is saved as a timestamped Markdown log.
//!
//! # Modules
//!
//! - [`session`] - the runner and its append-only buffer
//! - [`retry`] - bounded retry with exponential backoff for one step
//! - [`session_log`] - writing the finished stream to disk
//! - [`llm`] - generation client trait and Gemini implementation
//! - [`pacing`] - injectable delays
//! - [`events`] - progress reporting
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod events;
pub mod llm;
pub mod pacing;
pub mod retry;
pub mod session;
pub mod session_log;

// Re-export commonly used types
pub use config::{Config, Environment, LlmConfig};
pub use events::{CollectingSink, EventSink, NullSink, SessionEvent};
pub use llm::{
    ErrorKind, GeminiClient, GenerationRequest, GenerationResponse, LlmClient, LlmError, create_client,
};
pub use pacing::{Pacer, PauseReason, RecordingPacer, TokioPacer};
pub use retry::{RetryOutcome, RetryPolicy, generate_with_retry};
pub use session::{SessionReport, SessionRunner, StreamOfConsciousness, Termination, Thought};
pub use session_log::{SessionLog, SessionLogError};
