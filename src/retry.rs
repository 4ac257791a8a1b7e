//! Bounded retry with exponential backoff around a single generation call
//!
//! Per attempt: success ends the loop, a rate limit backs off and tries
//! again, an empty response waits briefly and tries again, anything else
//! abandons the iteration. Rate limits and empty responses both use up one
//! attempt from the ceiling; only rate limits double the backoff.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::events::{EventSink, SessionEvent};
use crate::llm::{ErrorKind, GenerationRequest, LlmClient, LlmError};
use crate::pacing::{Pacer, PauseReason};

/// Retry ceiling and delays for one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub empty_response_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            empty_response_delay: Duration::from_millis(config.empty_response_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the n-th rate-limit failure (1-based): initial * 2^(n-1)
    pub fn backoff_for(&self, failure: u32) -> Duration {
        2u32.checked_pow(failure.saturating_sub(1))
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Result of running one iteration under the retry policy
#[derive(Debug)]
pub enum RetryOutcome {
    /// A non-empty, trimmed thought
    Success { text: String, attempts: u32 },
    /// Ceiling reached by rate limits and/or empty responses
    Exhausted { attempts: u32 },
    /// Unclassified failure; no further attempts were made
    Aborted { attempts: u32, error: LlmError },
}

/// Run `request` against `client` until it yields text or the policy gives up
pub async fn generate_with_retry(
    client: &dyn LlmClient,
    pacer: &dyn Pacer,
    sink: &dyn EventSink,
    policy: &RetryPolicy,
    step: u32,
    request: &GenerationRequest,
) -> RetryOutcome {
    debug!(step, max_attempts = policy.max_attempts, "generate_with_retry: called");
    let mut rate_limit_failures = 0;

    for attempt in 1..=policy.max_attempts {
        let has_next = attempt < policy.max_attempts;

        match client.generate(request.clone()).await {
            Ok(response) => match response.trimmed_text() {
                Some(text) => {
                    debug!(step, attempt, "generate_with_retry: success");
                    return RetryOutcome::Success {
                        text: text.to_string(),
                        attempts: attempt,
                    };
                }
                None => {
                    warn!(step, attempt, finish_reason = ?response.finish_reason, "Empty response");
                    if has_next {
                        sink.emit(SessionEvent::EmptyResponse { step, attempt });
                        pacer.pause(PauseReason::EmptyResponse, policy.empty_response_delay).await;
                    }
                }
            },
            Err(error) => match error.kind() {
                ErrorKind::RateLimited => {
                    rate_limit_failures += 1;
                    let wait = policy.backoff_for(rate_limit_failures);
                    warn!(
                        step,
                        attempt,
                        ?wait,
                        server_retry_after = ?error.retry_after(),
                        "Rate limited: {}",
                        error
                    );
                    if has_next {
                        sink.emit(SessionEvent::RateLimited {
                            step,
                            attempt,
                            max_attempts: policy.max_attempts,
                            wait,
                        });
                        pacer.pause(PauseReason::Backoff, wait).await;
                    }
                }
                ErrorKind::Other => {
                    warn!(step, attempt, "Generation failed: {}", error);
                    sink.emit(SessionEvent::AttemptFailed {
                        step,
                        error: error.to_string(),
                    });
                    return RetryOutcome::Aborted {
                        attempts: attempt,
                        error,
                    };
                }
            },
        }
    }

    warn!(step, attempts = policy.max_attempts, "Retries exhausted");
    sink.emit(SessionEvent::RetriesExhausted {
        step,
        attempts: policy.max_attempts,
    });
    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}
