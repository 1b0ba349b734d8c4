//! Error types for vkvideo-dl
//!
//! This module groups the failures the library can report:
//! - Input errors raised while normalizing user input ([`NormalizeError`])
//! - Failures across the external downloader boundary ([`EngineError`])
//! - Configuration, I/O and runtime errors (the top-level [`Error`])
//!
//! User-initiated cancellation is deliberately absent from this taxonomy. A
//! cancelled download is reported as [`Outcome::Cancelled`](crate::types::Outcome),
//! never as an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vkvideo-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vkvideo-dl
#[derive(Debug, Error)]
pub enum Error {
    /// User input could not be turned into a request URL
    #[error("invalid input: {0}")]
    Normalize(#[from] NormalizeError),

    /// The external downloader failed
    #[error("download engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "engine.format")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A task was started outside of a Tokio runtime
    #[error("no Tokio runtime available to run the download task")]
    NoRuntime,
}

/// Input errors produced by [`normalize`](crate::normalize::normalize)
///
/// These are always recoverable: they are surfaced to the caller before any
/// download task is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Input was empty or contained only whitespace
    #[error("no video link or identifier was provided")]
    EmptyInput,

    /// Input looked like a link or identifier but could not be parsed
    #[error("malformed video identifier {input:?}: {reason}")]
    MalformedIdentifier {
        /// The trimmed input that was rejected
        input: String,
        /// Why the input was rejected
        reason: String,
    },
}

impl NormalizeError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Marker returned by a [`ProgressHook`](crate::engine::ProgressHook) to make
/// the engine abandon the transfer
///
/// Engines must propagate it as [`EngineError::Aborted`] without retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("download aborted by progress hook")]
pub struct Aborted;

/// Errors raised across the external downloader boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// The downloader executable is missing and could not be installed
    #[error("{tool} is not installed: {reason}")]
    NotInstalled {
        /// Name of the missing tool
        tool: String,
        /// Why it could not be located or installed
        reason: String,
    },

    /// Self-installation was attempted and failed
    #[error("failed to install {tool}: {reason}")]
    InstallFailed {
        /// Name of the tool being installed
        tool: String,
        /// The reason installation failed
        reason: String,
    },

    /// The downloader process could not be started
    #[error("failed to start {binary}: {source}")]
    Spawn {
        /// Path of the executable that failed to start
        binary: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The downloader exited unsuccessfully
    #[error("{message}")]
    Exited {
        /// Process exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Best available explanation (usually the last `ERROR:` line)
        message: String,
    },

    /// The downloader finished but never reported what it saved
    #[error("download finished without reporting file metadata")]
    MissingMetadata,

    /// The transfer was abandoned because the progress hook asked for it
    #[error("download aborted")]
    Aborted,

    /// I/O error while talking to the downloader
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other downloader failure
    #[error("{0}")]
    Other(String),
}

impl From<Aborted> for EngineError {
    fn from(_: Aborted) -> Self {
        EngineError::Aborted
    }
}

impl EngineError {
    /// Whether this error only exists to unwind a cancelled transfer
    pub fn is_abort(&self) -> bool {
        matches!(self, EngineError::Aborted)
    }
}
