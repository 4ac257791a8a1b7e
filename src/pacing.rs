//! Pacing - the replaceable delay capability
//!
//! Every pause the session takes (between thoughts, after an empty response,
//! rate-limit backoff) goes through a [`Pacer`], so tests can run a full
//! session without sleeping.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Why the session is pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Simulated passage of time after an accepted thought
    InterStep,
    /// Short wait after the model returned no text
    EmptyResponse,
    /// Exponential backoff after a rate-limit failure
    Backoff,
}

/// Something that can wait
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, reason: PauseReason, duration: Duration);
}

/// Real pacer backed by `tokio::time::sleep`
#[derive(Debug, Clone, Default)]
pub struct TokioPacer {
    skip_inter_step: bool,
}

impl TokioPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the inter-step pause; backoff and empty-response waits still apply
    pub fn without_inter_step(mut self) -> Self {
        self.skip_inter_step = true;
        self
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, reason: PauseReason, duration: Duration) {
        if self.skip_inter_step && reason == PauseReason::InterStep {
            debug!("TokioPacer::pause: inter-step pause skipped");
            return;
        }
        debug!(?reason, ?duration, "TokioPacer::pause: sleeping");
        tokio::time::sleep(duration).await;
    }
}

/// Pacer that records pauses and returns immediately
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(PauseReason, Duration)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pauses requested so far, in order
    pub fn pauses(&self) -> Vec<(PauseReason, Duration)> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Durations of pauses with the given reason, in order
    pub fn durations(&self, reason: PauseReason) -> Vec<Duration> {
        self.pauses()
            .into_iter()
            .filter(|(r, _)| *r == reason)
            .map(|(_, d)| d)
            .collect()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, reason: PauseReason, duration: Duration) {
        debug!(?reason, ?duration, "RecordingPacer::pause: recorded");
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push((reason, duration));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_pacer() {
        let pacer = RecordingPacer::new();

        pacer.pause(PauseReason::Backoff, Duration::from_secs(5)).await;
        pacer.pause(PauseReason::InterStep, Duration::from_secs(3)).await;
        pacer.pause(PauseReason::Backoff, Duration::from_secs(10)).await;

        assert_eq!(pacer.pauses().len(), 3);
        assert_eq!(
            pacer.durations(PauseReason::Backoff),
            vec![Duration::from_secs(5), Duration::from_secs(10)]
        );
        assert!(pacer.durations(PauseReason::EmptyResponse).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_sleeps() {
        let pacer = TokioPacer::new();
        let start = tokio::time::Instant::now();

        pacer.pause(PauseReason::InterStep, Duration::from_secs(3)).await;

        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_skips_inter_step() {
        let pacer = TokioPacer::new().without_inter_step();
        let start = tokio::time::Instant::now();

        pacer.pause(PauseReason::InterStep, Duration::from_secs(3)).await;
        assert!(start.elapsed() < Duration::from_secs(1));

        pacer.pause(PauseReason::Backoff, Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
