//! SessionRunner - grows a stream of consciousness one thought at a time
//!
//! Each step sends the whole stream so far as the prompt, appends the
//! model's next thought, and moves on. A step that cannot produce a thought
//! ends the run early; whatever has accumulated is kept for the session log.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, SessionConfig};
use crate::events::{EventSink, NullSink, SessionEvent};
use crate::llm::{GenerationRequest, LlmClient};
use crate::pacing::{Pacer, PauseReason};
use crate::retry::{RetryOutcome, RetryPolicy, generate_with_retry};

/// Append-only text buffer seeded with the opening thought
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOfConsciousness {
    text: String,
}

impl StreamOfConsciousness {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { text: seed.into() }
    }

    /// Append one fragment, separated from what came before by a single space
    pub fn append(&mut self, fragment: &str) {
        self.text.push(' ');
        self.text.push_str(fragment);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for StreamOfConsciousness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One accepted fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thought {
    /// 1-based step that produced it
    pub step: u32,
    pub text: String,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Every configured step produced a thought
    Completed { steps: u32 },
    /// A step hit the attempt ceiling; later steps were skipped
    RetriesExhausted { step: u32, attempts: u32 },
    /// A step failed with an error that is not retried
    Aborted { step: u32, reason: String },
}

impl Termination {
    pub fn is_complete(&self) -> bool {
        matches!(self, Termination::Completed { .. })
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed { steps } => write!(f, "completed all {} steps", steps),
            Termination::RetriesExhausted { step, attempts } => {
                write!(f, "failed to generate thought at step {} after {} retries", step, attempts)
            }
            Termination::Aborted { step, reason } => write!(f, "error at step {}: {}", step, reason),
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub stream: StreamOfConsciousness,
    pub thoughts: Vec<Thought>,
    pub termination: Termination,
}

/// Drives the generation loop for one session
pub struct SessionRunner {
    session: SessionConfig,
    policy: RetryPolicy,
    llm: Arc<dyn LlmClient>,
    pacer: Arc<dyn Pacer>,
    sink: Arc<dyn EventSink>,
}

impl SessionRunner {
    /// Create a runner from the resolved configuration
    pub fn new(config: &Config, llm: Arc<dyn LlmClient>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            session: config.session.clone(),
            policy: RetryPolicy::from(&config.retry),
            llm,
            pacer,
            sink: Arc::new(NullSink),
        }
    }

    /// Report progress to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run every step in order, stopping at the first step that fails
    pub async fn run(&self) -> SessionReport {
        info!(
            model = %self.llm.model(),
            iterations = self.session.iterations,
            "Starting meditation session"
        );
        self.sink.emit(SessionEvent::Started {
            iterations: self.session.iterations,
            seed: self.session.seed.clone(),
        });

        let mut stream = StreamOfConsciousness::new(self.session.seed.clone());
        let mut thoughts = Vec::new();
        let mut termination = Termination::Completed {
            steps: self.session.iterations,
        };

        for step in 1..=self.session.iterations {
            debug!(step, stream_len = stream.len(), "run: step");
            let request = GenerationRequest::new(
                stream.as_str(),
                self.session.system_directive.as_str(),
                self.session.max_output_tokens,
                self.session.temperature,
            );

            let outcome = generate_with_retry(
                self.llm.as_ref(),
                self.pacer.as_ref(),
                self.sink.as_ref(),
                &self.policy,
                step,
                &request,
            )
            .await;

            match outcome {
                RetryOutcome::Success { text, attempts } => {
                    info!(step, attempts, "Thought accepted");
                    stream.append(&text);
                    self.sink.emit(SessionEvent::ThoughtAccepted {
                        step,
                        text: text.clone(),
                    });
                    thoughts.push(Thought { step, text });
                    self.pacer
                        .pause(PauseReason::InterStep, self.session.inter_step_delay())
                        .await;
                }
                RetryOutcome::Exhausted { attempts } => {
                    warn!(step, attempts, "Ending session early: retries exhausted");
                    termination = Termination::RetriesExhausted { step, attempts };
                    break;
                }
                RetryOutcome::Aborted { error, .. } => {
                    warn!(step, "Ending session early: {}", error);
                    termination = Termination::Aborted {
                        step,
                        reason: error.to_string(),
                    };
                    break;
                }
            }
        }

        info!(thoughts = thoughts.len(), %termination, "Session ended");
        self.sink.emit(SessionEvent::Ended {
            thoughts: thoughts.len(),
        });

        SessionReport {
            stream,
            thoughts,
            termination,
        }
    }
}
