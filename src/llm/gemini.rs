//! Google Gemini API client implementation
//!
//! Implements the LlmClient trait for the Generative Language
//! `generateContent` endpoint. Retries are left to the caller's policy;
//! every call here is exactly one HTTP request.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::error::RESOURCE_EXHAUSTED;
use super::{FinishReason, GenerationRequest, GenerationResponse, LlmClient, LlmError, TokenUsage};
use crate::config::{Environment, LlmConfig};

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig, env: &Environment) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.get_api_key(env).map_err(|e| LlmError::Config(e.to_string()))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout())
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the generateContent endpoint
    fn build_request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_output_tokens, "build_request_body: called");
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_output_tokens,
            },
        });

        if !request.system_directive.trim().is_empty() {
            debug!("build_request_body: adding system instruction");
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": request.system_directive }],
            });
        }

        body
    }

    /// Parse a successful API response
    fn parse_response(&self, api_response: GeminiResponse) -> GenerationResponse {
        debug!(candidates = %api_response.candidates.len(), "parse_response: called");
        let candidate = api_response.candidates.into_iter().next();

        let finish_reason = candidate
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .map(FinishReason::from_gemini)
            .unwrap_or_default();

        let text = candidate
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());

        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        GenerationResponse {
            text,
            finish_reason,
            usage,
        }
    }

    /// Turn a non-success status and body into a classified error
    fn parse_error(status: u16, body: &str, retry_after: Option<Duration>) -> LlmError {
        debug!(%status, "parse_error: called");
        let (code, message) = match serde_json::from_str::<GeminiErrorEnvelope>(body) {
            Ok(envelope) => (Some(envelope.error.status), envelope.error.message),
            Err(_) => {
                debug!("parse_error: body is not a Gemini error envelope");
                (None, body.to_string())
            }
        };

        if status == 429 || code.as_deref() == Some(RESOURCE_EXHAUSTED) {
            debug!("parse_error: rate limited");
            return LlmError::RateLimited { retry_after, message };
        }

        LlmError::ApiError { status, code, message }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        debug!(%self.model, prompt_len = request.prompt.len(), "generate: called");
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.clone())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            debug!(%status, "generate: API error");
            return Err(Self::parse_error(status, &text, retry_after));
        }

        let text = response.text().await?;
        let api_response: GeminiResponse = serde_json::from_str(&text)?;
        let parsed = self.parse_response(api_response);
        debug!(
            prompt_tokens = parsed.usage.prompt_tokens,
            output_tokens = parsed.usage.output_tokens,
            finish_reason = ?parsed.finish_reason,
            "generate: success"
        );
        Ok(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}
