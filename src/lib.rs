//! # vkvideo-dl
//!
//! Download VK videos by link or identifier, with live progress and
//! pause/resume/cancel control.
//!
//! ## Design Philosophy
//!
//! vkvideo-dl is designed to be:
//! - **Forgiving about input** - Any common link shape or bare `-123_456` id
//!   normalizes to one canonical URL
//! - **Controllable** - A running download can be paused, resumed and
//!   cancelled from any thread
//! - **Event-driven** - Consumers read progress and the final outcome from a
//!   channel, no polling required
//! - **Engine-agnostic** - Extraction and transport sit behind the
//!   [`MediaEngine`] trait; [`YtDlpEngine`] is the production backend
//!
//! ## Quick Start
//!
//! ```no_run
//! use vkvideo_dl::{Config, TaskEvent, new_download};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let (task, mut events) = new_download("vk.com/video-12345_67890", &config)?;
//!
//!     task.start()?;
//!     while let Some(event) = events.recv().await {
//!         if let TaskEvent::Finished { outcome } = event {
//!             println!("Finished: {:?}", outcome);
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// External download engine boundary and the yt-dlp backend
pub mod engine;
/// Error types
pub mod error;
/// Input normalization into canonical request URLs
pub mod normalize;
/// Terminal escape sequence removal
pub mod sanitize;
/// Download task state machine and control surface
pub mod task;
/// Core types
pub mod types;

pub use config::Config;
pub use engine::{MediaEngine, ProgressHook, YtDlpEngine};
pub use error::{Aborted, EngineError, Error, NormalizeError, Result};
pub use normalize::{CanonicalUrl, UrlKind, normalize};
pub use task::DownloadTask;
pub use types::{Outcome, ProgressEvent, ProgressStatus, TaskEvent, TaskSnapshot, TaskState};

use std::sync::Arc;
use tokio::sync::mpsc;

/// Normalize `raw` and build an idle yt-dlp download task from `config`
///
/// # Errors
///
/// Returns [`Error::Normalize`] if `raw` is not a usable link or identifier.
/// No task is created in that case.
pub fn new_download(
    raw: &str,
    config: &Config,
) -> Result<(DownloadTask, mpsc::UnboundedReceiver<TaskEvent>)> {
    let url = normalize(raw)?;
    tracing::debug!(input = raw, url = %url, kind = ?url.kind(), "normalized input");
    let engine = Arc::new(YtDlpEngine::new(config.engine.clone()));
    Ok(DownloadTask::new(
        url,
        config.download.output_dir.clone(),
        engine,
    ))
}

/// Cancel `task` when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Only the first signal is handled; returns the task state after the cancel
/// request.
///
/// # Example
///
/// ```no_run
/// use vkvideo_dl::{Config, cancel_on_signal, new_download};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (task, _events) = new_download("-12345_67890", &Config::default())?;
///     task.start()?;
///
///     tokio::spawn(cancel_on_signal(task.clone()));
///     println!("{:?}", task.join().await);
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(task: DownloadTask) -> TaskState {
    wait_for_signal().await;
    task.cancel()
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
