//! Adapter between the engine's progress callbacks and the task's control block

use super::Shared;
use crate::engine::{LogLevel, ProgressHook, ProgressTick};
use crate::error::Aborted;
use crate::sanitize;
use crate::types::{ProgressEvent, ProgressStatus, TaskEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// [`ProgressHook`] handed to the engine for one task
pub(super) struct TaskHook {
    shared: Arc<Shared>,
}

impl TaskHook {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl ProgressHook for TaskHook {
    async fn on_progress(&self, tick: ProgressTick) -> Result<(), Aborted> {
        loop {
            // Registered before the flags are checked so a resume or cancel
            // between the check and the await still wakes us
            let woken = self.shared.wake.notified();
            {
                let mut control = self.shared.control();
                if control.cancel_requested {
                    tracing::debug!(url = %self.shared.url, "progress tick observed cancellation");
                    return Err(Aborted);
                }
                if !control.pause_requested {
                    let event = ProgressEvent::downloading(
                        tick.percent,
                        tick.speed.as_deref().map(sanitize::clean),
                        tick.eta.as_deref().map(sanitize::clean),
                    );
                    control.last_progress = Some(event.clone());
                    self.shared.emit(TaskEvent::Progress { event });
                    return Ok(());
                }
            }
            tracing::trace!(url = %self.shared.url, "progress tick waiting while paused");
            woken.await;
        }
    }

    fn on_log(&self, level: LogLevel, message: &str) {
        let text = sanitize::clean(message);
        let status = match level {
            LogLevel::Debug if text.starts_with("[download]") => ProgressStatus::Log,
            LogLevel::Debug => {
                tracing::trace!(url = %self.shared.url, "{text}");
                return;
            }
            LogLevel::Info => ProgressStatus::Log,
            LogLevel::Warning => ProgressStatus::Warning,
            LogLevel::Error => ProgressStatus::Error,
        };

        match status {
            ProgressStatus::Error => tracing::warn!(url = %self.shared.url, "{text}"),
            _ => tracing::debug!(url = %self.shared.url, "{text}"),
        }

        self.shared.emit(TaskEvent::Progress {
            event: ProgressEvent::message(status, text),
        });
    }
}
