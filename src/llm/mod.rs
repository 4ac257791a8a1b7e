//! LLM Client module for Meditation
//!
//! Provides the text generation client trait, the Gemini implementation,
//! and failure classification for the retry policy.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::LlmClient;
pub use error::{ErrorKind, LlmError};
pub use gemini::GeminiClient;
pub use types::{FinishReason, GenerationRequest, GenerationResponse, TokenUsage};

use crate::config::{Environment, LlmConfig};

/// Create an LLM client based on the provider specified in config
///
/// Supports the "gemini" provider.
pub fn create_client(config: &LlmConfig, env: &Environment) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" | "google" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config, env)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: gemini",
                other
            )))
        }
    }
}
