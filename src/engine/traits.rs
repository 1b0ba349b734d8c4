//! Traits and types at the external downloader boundary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Aborted, EngineError};
use crate::normalize::CanonicalUrl;

/// Output filename template, relative to the output directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Severity of an engine log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic chatter
    Debug,
    /// Normal status output
    Info,
    /// Something looks off but the transfer continues
    Warning,
    /// The engine hit an error
    Error,
}

/// One progress report from the engine
///
/// Text fields are passed through as the engine produced them and may still
/// contain terminal escape sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressTick {
    /// Completion percentage (0.0 to 100.0), if known
    pub percent: Option<f64>,
    /// Transfer speed text, e.g. `1.00MiB/s`
    pub speed: Option<String>,
    /// Remaining time text, e.g. `00:05`
    pub eta: Option<String>,
}

/// What to download and where
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Canonical URL of the video
    pub url: CanonicalUrl,
    /// Output directory (None = current working directory)
    pub output_dir: Option<PathBuf>,
}

impl FetchRequest {
    /// Create a new request
    pub fn new(url: CanonicalUrl, output_dir: Option<PathBuf>) -> Self {
        Self { url, output_dir }
    }

    /// yt-dlp output template: `{dir}/%(title)s.%(ext)s` or `%(title)s.%(ext)s`
    pub fn output_template(&self) -> String {
        match &self.output_dir {
            Some(dir) => dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
            None => OUTPUT_TEMPLATE.to_string(),
        }
    }
}

/// Metadata of the saved media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Video title
    pub title: String,
    /// File extension without the dot, e.g. `mp4`
    pub extension: String,
    /// Where the engine says it wrote the file, if it reports that
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl MediaInfo {
    /// Absolute location of the saved file
    ///
    /// Uses the engine-reported path when present, otherwise
    /// `{output_dir}/{title}.{extension}`. Relative paths are resolved against
    /// `cwd`.
    pub fn resolve_path(&self, output_dir: Option<&Path>, cwd: &Path) -> PathBuf {
        let path = match &self.file_path {
            Some(reported) => reported.clone(),
            None => {
                let file_name = format!("{}.{}", self.title, self.extension);
                match output_dir {
                    Some(dir) => dir.join(file_name),
                    None => PathBuf::from(file_name),
                }
            }
        };

        if path.is_absolute() {
            path
        } else {
            cwd.join(path)
        }
    }
}

/// Receiver of engine progress and log output
///
/// `on_progress` is awaited by the engine at every progress tick. Returning
/// `Err(Aborted)` tells the engine to stop the transfer and return
/// [`EngineError::Aborted`].
#[async_trait]
pub trait ProgressHook: Send + Sync {
    /// Called at every progress tick; may suspend the engine (pause)
    async fn on_progress(&self, tick: ProgressTick) -> Result<(), Aborted>;

    /// Called for every log line the engine produces
    fn on_log(&self, level: LogLevel, message: &str);
}

/// A media extraction and download engine
///
/// The engine owns format selection, extraction and transport. Callers only
/// see a URL going in and [`MediaInfo`] coming out.
///
/// # Examples
///
/// ```no_run
/// use vkvideo_dl::config::EngineConfig;
/// use vkvideo_dl::engine::{MediaEngine, YtDlpEngine};
///
/// let engine = YtDlpEngine::new(EngineConfig::default());
/// assert_eq!(engine.name(), "yt-dlp");
/// ```
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Make sure the engine can run, installing it if needed
    ///
    /// Called once per task before [`fetch`](Self::fetch). Implementations
    /// should cache the result so repeated calls are cheap.
    async fn prepare(&self, hook: &dyn ProgressHook) -> Result<(), EngineError> {
        let _ = hook;
        Ok(())
    }

    /// Resolve and download the media behind `request.url`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Aborted`] if `hook` aborted the transfer, or
    /// another [`EngineError`] describing why the download failed.
    async fn fetch(
        &self,
        request: &FetchRequest,
        hook: &dyn ProgressHook,
    ) -> Result<MediaInfo, EngineError>;
}
