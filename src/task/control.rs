//! Task lifecycle control: start, pause, resume, cancel, join

use super::{DownloadTask, runner};
use crate::error::{Error, Result};
use crate::types::{Outcome, TaskState};

impl DownloadTask {
    /// Start the download in the background
    ///
    /// Returns immediately. The task reports `Running` once the engine is
    /// prepared; until then it stays `Idle`. Only an idle task that was never
    /// started can be started; any other call does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a Tokio runtime. The
    /// task stays `Idle` in that case.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        {
            let mut control = self.shared.control();
            if control.state != TaskState::Idle || control.starting {
                tracing::debug!(url = %self.shared.url, state = ?control.state, "start ignored, task already started");
                return Ok(());
            }
            control.starting = true;
            control.started_at = Some(chrono::Utc::now());
        }

        tracing::info!(url = %self.shared.url, "starting download");
        self.shared
            .status(&format!("Starting download: {}", self.shared.url));

        runtime.spawn(runner::run(self.shared.clone()));
        Ok(())
    }

    /// Pause a running download
    ///
    /// The engine is suspended at its next progress tick. Has no effect unless
    /// the task is `Running`. Returns the state after the call.
    pub fn pause(&self) -> TaskState {
        let mut control = self.shared.control();
        if control.state == TaskState::Running {
            control.pause_requested = true;
            self.shared.transition(&mut control, TaskState::Paused);
            tracing::info!(url = %self.shared.url, "download paused");
        }
        control.state
    }

    /// Resume a paused download
    ///
    /// Has no effect unless the task is `Paused`. Returns the state after the
    /// call.
    pub fn resume(&self) -> TaskState {
        let state = {
            let mut control = self.shared.control();
            if control.state != TaskState::Paused {
                return control.state;
            }
            control.pause_requested = false;
            self.shared.transition(&mut control, TaskState::Running);
            control.state
        };
        self.shared.wake.notify_waiters();
        tracing::info!(url = %self.shared.url, "download resumed");
        state
    }

    /// Request cancellation
    ///
    /// A paused download is woken so it can observe the request, and a task
    /// still preparing its engine never starts fetching. The task reaches
    /// `Cancelled` once the engine unwinds. Calling this again, or on a task
    /// that was never started or has finished, has no effect. Returns the
    /// state after the call.
    pub fn cancel(&self) -> TaskState {
        let state = {
            let mut control = self.shared.control();
            let preparing = control.state == TaskState::Idle && control.starting;
            if !preparing && !matches!(control.state, TaskState::Running | TaskState::Paused) {
                return control.state;
            }
            control.cancel_requested = true;
            self.shared.transition(&mut control, TaskState::Cancelling);
            control.state
        };
        self.shared.wake.notify_waiters();
        tracing::info!(url = %self.shared.url, "download cancellation requested");
        state
    }

    /// Wait for the terminal outcome
    ///
    /// Never returns for a task that is never started.
    pub async fn join(&self) -> Outcome {
        loop {
            let finished = self.shared.finished.notified();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            finished.await;
        }
    }
}
