//! Session events for progress reporting
//!
//! The runner and retry policy report what they are doing through an
//! [`EventSink`]. The CLI prints them; tests collect them.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// Observable session activity
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Run is starting from the seed
    Started { iterations: u32, seed: String },
    /// A thought was accepted and appended
    ThoughtAccepted { step: u32, text: String },
    /// The model answered with no text
    EmptyResponse { step: u32, attempt: u32 },
    /// Rate limited; waiting `wait` before the next attempt
    RateLimited {
        step: u32,
        attempt: u32,
        max_attempts: u32,
        wait: Duration,
    },
    /// Unclassified failure; the iteration is abandoned
    AttemptFailed { step: u32, error: String },
    /// Attempt ceiling reached without a thought
    RetriesExhausted { step: u32, attempts: u32 },
    /// Run is over (for any reason)
    Ended { thoughts: usize },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Started { iterations, seed } => {
                writeln!(f, "--- Starting Meditation Session ({} steps) ---", iterations)?;
                writeln!(f, "SEED: {}", seed)
            }
            SessionEvent::ThoughtAccepted { step, text } => write!(f, "[Thought {}]: {}", step, text),
            SessionEvent::EmptyResponse { step, .. } => {
                write!(f, "Warning: Empty response at step {}. Retrying...", step)
            }
            SessionEvent::RateLimited {
                step,
                attempt,
                max_attempts,
                wait,
            } => write!(
                f,
                "Rate limit hit at step {}. Waiting {}s before retry {}/{}...",
                step,
                wait.as_secs_f64(),
                attempt,
                max_attempts
            ),
            SessionEvent::AttemptFailed { step, error } => write!(f, "Error at step {}: {}", step, error),
            SessionEvent::RetriesExhausted { step, attempts } => write!(
                f,
                "Failed to generate thought at step {} after {} retries.",
                step, attempts
            ),
            SessionEvent::Ended { .. } => write!(f, "\n--- Session Ended ---"),
        }
    }
}

/// Receiver of session events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

impl<F> EventSink for F
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn emit(&self, event: SessionEvent) {
        self(event)
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SessionEvent) {}
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
