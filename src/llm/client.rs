//! LlmClient trait definition

use async_trait::async_trait;

use super::{GenerationRequest, GenerationResponse, LlmError};

/// Stateless text generation client - each call is independent
///
/// The whole conversation state lives in the prompt the caller passes in;
/// implementations keep nothing between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single generation request and wait for the full response
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}
