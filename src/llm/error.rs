//! LLM error types and failure classification

use std::time::Duration;
use thiserror::Error;

/// API status string Google uses for quota and rate exhaustion
pub const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited ({message}), retry after {retry_after:?}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("API error {status}: {message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the retry policy treats a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Quota or rate exhaustion: back off and try again
    RateLimited,
    /// Anything else: give up on the iteration
    Other,
}

impl LlmError {
    /// Classify this failure for the retry policy
    ///
    /// Structured status codes are checked first. Errors that carry no code
    /// fall back to inspecting their message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::RateLimited { .. } => ErrorKind::RateLimited,
            LlmError::ApiError { status, code, message } => {
                if *status == 429 || code.as_deref() == Some(RESOURCE_EXHAUSTED) {
                    ErrorKind::RateLimited
                } else {
                    classify_message(message)
                }
            }
            LlmError::Network(e) => match e.status() {
                Some(status) if status.as_u16() == 429 => ErrorKind::RateLimited,
                Some(_) => ErrorKind::Other,
                None => classify_message(&e.to_string()),
            },
            LlmError::InvalidResponse(message) => classify_message(message),
            LlmError::Config(_) | LlmError::Json(_) => ErrorKind::Other,
        }
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    /// Get the server-suggested retry duration, if one was sent
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Message-based fallback for errors without a structured code
fn classify_message(message: &str) -> ErrorKind {
    if message.contains("429") || message.contains(RESOURCE_EXHAUSTED) {
        ErrorKind::RateLimited
    } else {
        ErrorKind::Other
    }
}
