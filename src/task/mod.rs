//! Pausable, cancellable download task
//!
//! A [`DownloadTask`] drives one [`MediaEngine`] fetch in a background Tokio
//! task. The caller controls it through [`start`](DownloadTask::start),
//! [`pause`](DownloadTask::pause), [`resume`](DownloadTask::resume) and
//! [`cancel`](DownloadTask::cancel), and observes it through the
//! [`TaskEvent`] channel returned by [`DownloadTask::new`].
//!
//! ```text
//! Idle --start, prepare ok--> Running <--pause/resume--> Paused
//!                    |                          |
//!                    +---------cancel-----------+--> Cancelling --> Cancelled
//!                    |
//!                    +--> Completed | Failed
//! ```
//!
//! The task stays `Idle` while the engine is prepared (yt-dlp located or
//! installed); a preparation failure goes straight to `Failed`. A cancel
//! during preparation moves to `Cancelling` and the engine never fetches.
//!
//! Pause and cancel are cooperative: they take effect at the engine's next
//! progress tick. A paused tick suspends the background task (never the
//! caller) until resume or cancel.

mod control;
mod hook;
mod runner;

use crate::engine::MediaEngine;
use crate::normalize::CanonicalUrl;
use crate::sanitize;
use crate::types::{Outcome, ProgressEvent, ProgressStatus, TaskEvent, TaskSnapshot, TaskState};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, mpsc};

/// A single video download with a pause/resume/cancel control surface
///
/// Cloning yields another handle to the same task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vkvideo_dl::config::EngineConfig;
/// use vkvideo_dl::engine::YtDlpEngine;
/// use vkvideo_dl::{DownloadTask, normalize};
///
/// # #[tokio::main]
/// # async fn main() -> vkvideo_dl::Result<()> {
/// let url = normalize("https://vkvideo.ru/video-12345_67890")?;
/// let engine = Arc::new(YtDlpEngine::new(EngineConfig::default()));
/// let (task, mut events) = DownloadTask::new(url, None, engine);
///
/// task.start()?;
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("{event:?}");
///     }
/// });
///
/// let outcome = task.join().await;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DownloadTask {
    shared: Arc<Shared>,
}

/// State shared between the task handle, the background runner and the hook
struct Shared {
    url: CanonicalUrl,
    output_dir: Option<PathBuf>,
    engine: Arc<dyn MediaEngine>,
    control: Mutex<Control>,
    /// Pause wait condition; signalled by resume and cancel
    wake: Notify,
    /// Signalled once the outcome is recorded
    finished: Notify,
    events: mpsc::UnboundedSender<TaskEvent>,
}

/// Mutable task state, guarded by [`Shared::control`]
#[derive(Default)]
struct Control {
    state: TaskState,
    /// `start` was accepted and the engine is still being prepared
    starting: bool,
    pause_requested: bool,
    cancel_requested: bool,
    last_progress: Option<ProgressEvent>,
    outcome: Option<Outcome>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Shared {
    /// Lock the control block
    ///
    /// No code panics while holding the lock, so a poisoned mutex still holds
    /// consistent state.
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TaskEvent) {
        // The caller may have dropped the receiver; the task still runs
        let _ = self.events.send(event);
    }

    /// Move to `state` and announce it; call with the control lock held
    fn transition(&self, control: &mut Control, state: TaskState) {
        tracing::debug!(url = %self.url, from = ?control.state, to = ?state, "task state change");
        control.state = state;
        self.emit(TaskEvent::StateChanged { state });
    }

    /// Enter `Running` once the engine is prepared
    ///
    /// Returns `false` if a cancel arrived during preparation.
    fn enter_running(&self) -> bool {
        let mut control = self.control();
        control.starting = false;
        if control.cancel_requested {
            return false;
        }
        self.transition(&mut control, TaskState::Running);
        true
    }

    /// Forward an internally generated status message as a `log` event
    fn status(&self, text: &str) {
        self.emit(TaskEvent::Progress {
            event: ProgressEvent::message(ProgressStatus::Log, sanitize::clean(text)),
        });
    }
}

impl DownloadTask {
    /// Create an idle task and the receiver for its events
    ///
    /// `output_dir` of `None` saves into the current working directory. Nothing
    /// runs until [`start`](Self::start) is called.
    pub fn new(
        url: CanonicalUrl,
        output_dir: Option<PathBuf>,
        engine: Arc<dyn MediaEngine>,
    ) -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = Shared {
            url,
            output_dir,
            engine,
            control: Mutex::new(Control::default()),
            wake: Notify::new(),
            finished: Notify::new(),
            events,
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            receiver,
        )
    }

    /// The canonical URL being downloaded
    pub fn url(&self) -> &CanonicalUrl {
        &self.shared.url
    }

    /// Requested output directory
    pub fn output_dir(&self) -> Option<&PathBuf> {
        self.shared.output_dir.as_ref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.shared.control().state
    }

    /// Terminal outcome, once the task has finished
    pub fn outcome(&self) -> Option<Outcome> {
        self.shared.control().outcome.clone()
    }

    /// Copy of the task's observable fields
    pub fn snapshot(&self) -> TaskSnapshot {
        let control = self.shared.control();
        let (result_path, error_detail) = match &control.outcome {
            Some(Outcome::Completed { path }) => (Some(path.clone()), None),
            Some(Outcome::Failed { detail }) => (None, Some(detail.clone())),
            _ => (None, None),
        };
        TaskSnapshot {
            state: control.state,
            url: self.shared.url.clone(),
            output_dir: self.shared.output_dir.clone(),
            progress: control.last_progress.clone(),
            result_path,
            error_detail,
            started_at: control.started_at,
            finished_at: control.finished_at,
        }
    }
}

impl std::fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTask")
            .field("url", &self.shared.url)
            .field("output_dir", &self.shared.output_dir)
            .field("state", &self.state())
            .finish()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
