//! Scripted engine for driving a task through specific interleavings

use crate::engine::{FetchRequest, LogLevel, MediaEngine, MediaInfo, ProgressHook, ProgressTick};
use crate::error::EngineError;
use crate::normalize::{CanonicalUrl, normalize};
use crate::task::DownloadTask;
use crate::types::{ProgressEvent, ProgressStatus, TaskEvent, TaskState};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// One step of a [`StubEngine`] script
pub(crate) enum Step {
    /// Report a progress tick; stops the script if the hook aborts
    Tick(f64),
    /// Report a progress tick with raw speed/eta text
    TickWith(f64, &'static str, &'static str),
    /// Emit a log line
    Log(LogLevel, &'static str),
    /// Wait until the gate is opened
    Wait(Arc<Notify>),
    /// Fail with the given message
    Fail(&'static str),
    /// Return `EngineError::Aborted` without being asked to
    Abort,
    /// Panic inside the engine
    Panic,
}

/// [`MediaEngine`] that plays back a fixed script
pub(crate) struct StubEngine {
    steps: Vec<Step>,
    info: MediaInfo,
    prepare_error: Option<&'static str>,
    prepare_gate: Option<Arc<Notify>>,
    pub(crate) fetch_calls: AtomicUsize,
}

impl StubEngine {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            info: MediaInfo {
                title: "clip".into(),
                extension: "mp4".into(),
                file_path: None,
            },
            prepare_error: None,
            prepare_gate: None,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_info(mut self, info: MediaInfo) -> Self {
        self.info = info;
        self
    }

    pub(crate) fn failing_prepare(mut self, reason: &'static str) -> Self {
        self.prepare_error = Some(reason);
        self
    }

    /// Hold `prepare` until the gate is opened
    pub(crate) fn gated_prepare(mut self, gate: Arc<Notify>) -> Self {
        self.prepare_gate = Some(gate);
        self
    }
}

#[async_trait]
impl MediaEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn prepare(&self, _hook: &dyn ProgressHook) -> Result<(), EngineError> {
        if let Some(gate) = &self.prepare_gate {
            gate.notified().await;
        }
        match self.prepare_error {
            Some(reason) => Err(EngineError::NotInstalled {
                tool: "stub".into(),
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }

    async fn fetch(
        &self,
        _request: &FetchRequest,
        hook: &dyn ProgressHook,
    ) -> Result<MediaInfo, EngineError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        for step in &self.steps {
            match step {
                Step::Tick(percent) => {
                    hook.on_progress(ProgressTick {
                        percent: Some(*percent),
                        speed: None,
                        eta: None,
                    })
                    .await?
                }
                Step::TickWith(percent, speed, eta) => {
                    hook.on_progress(ProgressTick {
                        percent: Some(*percent),
                        speed: Some((*speed).to_string()),
                        eta: Some((*eta).to_string()),
                    })
                    .await?
                }
                Step::Log(level, message) => hook.on_log(*level, message),
                Step::Wait(gate) => gate.notified().await,
                Step::Fail(message) => return Err(EngineError::Other((*message).to_string())),
                Step::Abort => return Err(EngineError::Aborted),
                Step::Panic => panic!("stub engine exploded"),
            }
        }
        Ok(self.info.clone())
    }
}

pub(crate) fn test_url() -> CanonicalUrl {
    normalize("https://vk.com/video-100_200").unwrap()
}

/// Build an idle task around `engine`
pub(crate) fn task_with(
    engine: Arc<StubEngine>,
) -> (DownloadTask, mpsc::UnboundedReceiver<TaskEvent>) {
    DownloadTask::new(test_url(), None, engine)
}

/// Wait for the next `downloading` event, skipping everything else
pub(crate) async fn next_tick(events: &mut mpsc::UnboundedReceiver<TaskEvent>) -> ProgressEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Some(TaskEvent::Progress { event }) if event.status == ProgressStatus::Downloading => {
                    return event;
                }
                Some(_) => continue,
                None => panic!("event channel closed before a progress tick"),
            }
        }
    })
    .await
    .expect("timed out waiting for a progress tick")
}

/// State changes among `events`, in order
pub(crate) fn states(events: &[TaskEvent]) -> Vec<TaskState> {
    events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}

/// Collect the events already queued on the channel
pub(crate) fn drain(events: &mut mpsc::UnboundedReceiver<TaskEvent>) -> Vec<TaskEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

/// Await the outcome with a timeout so a hung task fails the test
pub(crate) async fn join(task: &DownloadTask) -> crate::types::Outcome {
    tokio::time::timeout(Duration::from_secs(5), task.join())
        .await
        .expect("task did not finish in time")
}
