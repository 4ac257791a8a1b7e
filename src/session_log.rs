//! Session log finalizer
//!
//! Writes the final stream of consciousness to
//! `<dir>/meditation_session_log_<YYYYMMDD_HHMMSS>.md`: a one-line header,
//! a blank line, then the stream exactly as it was held in memory.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info};

use crate::session::StreamOfConsciousness;

/// Timestamp format embedded in file names and the header
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const FILE_PREFIX: &str = "meditation_session_log_";

/// Errors from writing a session log
#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("No stream of consciousness generated")]
    EmptyStream,

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write session log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes session logs into one output directory
#[derive(Debug, Clone)]
pub struct SessionLog {
    dir: PathBuf,
}

impl SessionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Log file path for a capture time
    pub fn path_for(&self, captured_at: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{}{}.md", FILE_PREFIX, captured_at.format(TIMESTAMP_FORMAT)))
    }

    /// Write the stream using the current local time
    pub fn write(&self, stream: &StreamOfConsciousness) -> Result<PathBuf, SessionLogError> {
        self.write_at(stream, &Local::now())
    }

    /// Write the stream stamped with `captured_at`
    ///
    /// Nothing is created on disk when the stream is empty.
    pub fn write_at(
        &self,
        stream: &StreamOfConsciousness,
        captured_at: &DateTime<Local>,
    ) -> Result<PathBuf, SessionLogError> {
        debug!(dir = %self.dir.display(), stream_len = stream.len(), "write_at: called");
        if stream.is_empty() {
            debug!("write_at: empty stream, nothing written");
            return Err(SessionLogError::EmptyStream);
        }

        fs::create_dir_all(&self.dir).map_err(|source| SessionLogError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(captured_at);
        let content = render(stream, captured_at);
        fs::write(&path, content).map_err(|source| SessionLogError::Write {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "Session log written");
        Ok(path)
    }
}

/// Header line, blank line, then the stream verbatim
fn render(stream: &StreamOfConsciousness, captured_at: &DateTime<Local>) -> String {
    format!(
        "# Meditation Session Log - {}\n\n{}",
        captured_at.format(TIMESTAMP_FORMAT),
        stream.as_str()
    )
}
