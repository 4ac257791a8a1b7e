//! Generation request/response types
//!
//! Provider-agnostic shapes for a single prompt-in, text-out call.

use tracing::debug;

/// A generation request - everything needed for one call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text (the whole stream of consciousness so far)
    pub prompt: String,

    /// System instruction applied to every call
    pub system_directive: String,

    /// Output length limit
    pub max_output_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        system_directive: impl Into<String>,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            system_directive: system_directive.into(),
            max_output_tokens,
            temperature,
        }
    }
}

/// Response from a generation request
#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    /// Generated text (None when the model produced nothing)
    pub text: Option<String>,

    /// Why the model stopped
    pub finish_reason: FinishReason,

    /// Token usage
    pub usage: TokenUsage,
}

impl GenerationResponse {
    /// Response carrying the given text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Response with no text at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Trimmed text, or None when missing or whitespace only
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FinishReason {
    #[default]
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl FinishReason {
    /// Parse from Gemini API finishReason string
    pub fn from_gemini(s: &str) -> Self {
        debug!(%s, "FinishReason::from_gemini: called");
        match s {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            other => {
                debug!("FinishReason::from_gemini: unrecognized reason");
                FinishReason::Other(other.to_string())
            }
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_text() {
        assert_eq!(GenerationResponse::text("  a breath.\n").trimmed_text(), Some("a breath."));
        assert_eq!(GenerationResponse::text(" \n\t").trimmed_text(), None);
        assert_eq!(GenerationResponse::empty().trimmed_text(), None);
    }

    #[test]
    fn test_finish_reason_from_gemini() {
        assert_eq!(FinishReason::from_gemini("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_gemini("MAX_TOKENS"), FinishReason::MaxTokens);
        assert_eq!(FinishReason::from_gemini("SAFETY"), FinishReason::Safety);
        assert_eq!(FinishReason::from_gemini("RECITATION"), FinishReason::Recitation);
        assert_eq!(
            FinishReason::from_gemini("BLOCKLIST"),
            FinishReason::Other("BLOCKLIST".to_string())
        );
    }
}
