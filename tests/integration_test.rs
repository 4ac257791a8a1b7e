//! Integration tests for Meditation
//!
//! These tests run whole sessions against a scripted client and check the
//! log file that comes out the other end.

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use meditation::{
    CollectingSink, Config, GenerationRequest, GenerationResponse, LlmClient, LlmError, PauseReason, RecordingPacer,
    SessionEvent, SessionLog, SessionLogError, SessionRunner, StreamOfConsciousness, Termination,
};
use tempfile::TempDir;

/// Replays a fixed script of results, one per call
struct ScriptedClient {
    script: Mutex<VecDeque<Result<GenerationResponse, LlmError>>>,
    calls: Mutex<u32>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<GenerationResponse, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn thought(text: &str) -> Result<GenerationResponse, LlmError> {
    Ok(GenerationResponse::text(text))
}

fn quota() -> Result<GenerationResponse, LlmError> {
    Err(LlmError::ApiError {
        status: 429,
        code: Some("RESOURCE_EXHAUSTED".to_string()),
        message: "Quota exceeded".to_string(),
    })
}

fn config(iterations: u32) -> Config {
    let mut config = Config::default();
    config.session.iterations = iterations;
    config.session.seed = "I am sitting on the cushion.".to_string();
    config
}

// =============================================================================
// Full session -> log file
// =============================================================================

#[tokio::test]
async fn test_full_session_log_matches_stream() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let client = ScriptedClient::new(vec![thought("Inhale."), thought("  Exhale.  "), thought("A car passes.")]);
    let pacer = Arc::new(RecordingPacer::new());

    let report = SessionRunner::new(&config(3), client.clone(), pacer.clone()).run().await;
    let path = SessionLog::new(temp.path().join("outputs"))
        .write(&report.stream)
        .expect("log should be written");

    let content = fs::read_to_string(&path).unwrap();
    let (header, body) = content.split_once("\n\n").unwrap();
    assert!(header.starts_with("# Meditation Session Log - "));
    assert_eq!(body, "I am sitting on the cushion. Inhale. Exhale. A car passes.");
    assert_eq!(body, report.stream.as_str());

    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("meditation_session_log_"));
    assert!(file_name.ends_with(".md"));
    // YYYYMMDD_HHMMSS
    assert_eq!(file_name.len(), "meditation_session_log_".len() + 15 + ".md".len());

    assert_eq!(client.calls(), 3);
    assert_eq!(pacer.durations(PauseReason::InterStep).len(), 3);
}

#[tokio::test]
async fn test_rate_limit_recovery_appends_one_fragment() {
    let client = ScriptedClient::new(vec![quota(), quota(), thought("The breath again.")]);
    let pacer = Arc::new(RecordingPacer::new());

    let report = SessionRunner::new(&config(1), client.clone(), pacer.clone()).run().await;

    assert_eq!(report.stream.as_str(), "I am sitting on the cushion. The breath again.");
    assert_eq!(report.thoughts.len(), 1);
    assert_eq!(
        pacer.durations(PauseReason::Backoff),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
}

#[tokio::test]
async fn test_exhausted_run_still_persists_partial_stream() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut script = vec![thought("First thought.")];
    script.extend((0..5).map(|_| quota()));
    let client = ScriptedClient::new(script);
    let sink = Arc::new(CollectingSink::new());

    let report = SessionRunner::new(&config(10), client.clone(), Arc::new(RecordingPacer::new()))
        .with_sink(sink.clone())
        .run()
        .await;

    assert_eq!(report.termination, Termination::RetriesExhausted { step: 2, attempts: 5 });
    assert_eq!(client.calls(), 6);
    assert!(
        sink.events()
            .contains(&SessionEvent::RetriesExhausted { step: 2, attempts: 5 })
    );

    let path = SessionLog::new(temp.path()).write(&report.stream).unwrap();
    let content = fs::read_to_string(path).unwrap();
    assert!(content.ends_with("\n\nI am sitting on the cushion. First thought."));
}

#[tokio::test]
async fn test_unclassified_error_stops_after_one_attempt() {
    let client = ScriptedClient::new(vec![
        Err(LlmError::ApiError {
            status: 400,
            code: Some("INVALID_ARGUMENT".to_string()),
            message: "API key not valid".to_string(),
        }),
        thought("unreachable"),
    ]);

    let report = SessionRunner::new(&config(5), client.clone(), Arc::new(RecordingPacer::new()))
        .run()
        .await;

    assert_eq!(client.calls(), 1);
    assert!(matches!(report.termination, Termination::Aborted { step: 1, .. }));
    assert_eq!(report.stream.as_str(), "I am sitting on the cushion.");
}

#[test]
fn test_empty_stream_is_not_written() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let dir = temp.path().join("outputs");
    let captured_at = Local.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

    let result = SessionLog::new(&dir).write_at(&StreamOfConsciousness::new(""), &captured_at);

    assert!(matches!(result, Err(SessionLogError::EmptyStream)));
    assert!(!dir.exists());
}
