//! Core types for vkvideo-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::normalize::CanonicalUrl;

/// Lifecycle state of a [`DownloadTask`](crate::task::DownloadTask)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Created, not started yet
    #[default]
    Idle,
    /// The engine is transferring data
    Running,
    /// Paused by the caller; the next progress tick waits
    Paused,
    /// Cancel requested; waiting for the engine to unwind
    Cancelling,
    /// The media file was saved
    Completed,
    /// Stopped by the caller
    Cancelled,
    /// The engine reported an error
    Failed,
}

impl TaskState {
    /// Whether no further transition can happen from this state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }

    /// Whether the background unit is still working
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskState::Running | TaskState::Paused | TaskState::Cancelling
        )
    }

    /// Lowercase name, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::Paused => "paused",
            TaskState::Cancelling => "cancelling",
            TaskState::Completed => "completed",
            TaskState::Cancelled => "cancelled",
            TaskState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a [`ProgressEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// A progress tick with percent/speed/eta
    Downloading,
    /// Informational message
    Log,
    /// Warning from the engine
    Warning,
    /// Error message from the engine
    Error,
}

/// Progress or log message forwarded to the caller
///
/// All text fields have had terminal control sequences removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// What kind of event this is
    pub status: ProgressStatus,
    /// Completion percentage (0.0 to 100.0), when the engine knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    /// Human-readable transfer speed, e.g. `1.00MiB/s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Human-readable time remaining, e.g. `00:05`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// Message text for log, warning and error events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ProgressEvent {
    /// A `downloading` event
    pub fn downloading(percent: Option<f64>, speed: Option<String>, eta: Option<String>) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            percent,
            speed,
            eta,
            text: None,
        }
    }

    /// A message event (`log`, `warning` or `error`)
    pub fn message(status: ProgressStatus, text: impl Into<String>) -> Self {
        Self {
            status,
            percent: None,
            speed: None,
            eta: None,
            text: Some(text.into()),
        }
    }
}

/// Terminal result of a download task
///
/// Serializes as `{"ok": true, "path": ...}`, `{"ok": false, "cancelled": true}`
/// or `{"ok": false, "cancelled": false, "detail": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord", try_from = "OutcomeRecord")]
pub enum Outcome {
    /// The media file was saved at `path`
    Completed {
        /// Absolute location of the saved file
        path: PathBuf,
    },
    /// The caller cancelled the download
    Cancelled,
    /// The download failed
    Failed {
        /// Sanitized error message
        detail: String,
    },
}

impl Outcome {
    /// Whether the file was saved
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// Whether the caller cancelled the download
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Location of the saved file, for completed downloads
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Outcome::Completed { path } => Some(path),
            _ => None,
        }
    }

    /// The terminal [`TaskState`] matching this outcome
    pub fn state(&self) -> TaskState {
        match self {
            Outcome::Completed { .. } => TaskState::Completed,
            Outcome::Cancelled => TaskState::Cancelled,
            Outcome::Failed { .. } => TaskState::Failed,
        }
    }
}

/// Wire shape of [`Outcome`]
#[derive(Serialize, Deserialize)]
struct OutcomeRecord {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancelled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<Outcome> for OutcomeRecord {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed { path } => Self {
                ok: true,
                path: Some(path),
                cancelled: None,
                detail: None,
            },
            Outcome::Cancelled => Self {
                ok: false,
                path: None,
                cancelled: Some(true),
                detail: None,
            },
            Outcome::Failed { detail } => Self {
                ok: false,
                path: None,
                cancelled: Some(false),
                detail: Some(detail),
            },
        }
    }
}

impl TryFrom<OutcomeRecord> for Outcome {
    type Error = String;

    fn try_from(record: OutcomeRecord) -> Result<Self, Self::Error> {
        match record {
            OutcomeRecord {
                ok: true,
                path: Some(path),
                ..
            } => Ok(Outcome::Completed { path }),
            OutcomeRecord { ok: true, .. } => Err("successful outcome without a path".into()),
            OutcomeRecord {
                cancelled: Some(true),
                ..
            } => Ok(Outcome::Cancelled),
            OutcomeRecord { detail, .. } => Ok(Outcome::Failed {
                detail: detail.unwrap_or_default(),
            }),
        }
    }
}

/// Event emitted by a download task to its caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// The task moved to a new state
    StateChanged {
        /// The new state
        state: TaskState,
    },

    /// Progress tick or log message
    Progress {
        /// The forwarded event
        event: ProgressEvent,
    },

    /// The task reached a terminal state; always the last event
    Finished {
        /// The terminal outcome
        outcome: Outcome,
    },
}

/// Point-in-time copy of a task's observable fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Current state
    pub state: TaskState,
    /// The canonical URL being downloaded
    pub url: CanonicalUrl,
    /// Requested output directory (current directory if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Most recent progress tick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressEvent>,
    /// Saved file location, once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    /// Failure message, once failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// When `start()` was accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
