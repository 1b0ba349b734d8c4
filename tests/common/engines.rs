//! Test doubles for the engine boundary

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use vkvideo_dl::engine::{FetchRequest, LogLevel, MediaEngine, MediaInfo, ProgressHook, ProgressTick};
use vkvideo_dl::{Aborted, EngineError};

/// One scripted engine action
#[derive(Clone)]
pub enum Action {
    /// Report a progress tick
    Progress(f64),
    /// Emit a log line
    Log(LogLevel, &'static str),
    /// Block until the gate is opened
    Gate(Arc<Notify>),
    /// Fail with `EngineError::Other`
    Fail(&'static str),
}

/// Engine that replays a script and then reports `info`
pub struct ScriptedEngine {
    actions: Vec<Action>,
    info: MediaInfo,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedEngine {
    pub fn new(actions: Vec<Action>, title: &str, extension: &str) -> Self {
        Self {
            actions,
            info: MediaInfo {
                title: title.to_string(),
                extension: extension.to_string(),
                file_path: None,
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen by `fetch`, in order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        hook: &dyn ProgressHook,
    ) -> Result<MediaInfo, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        for action in &self.actions {
            match action {
                Action::Progress(percent) => {
                    hook.on_progress(ProgressTick {
                        percent: Some(*percent),
                        ..ProgressTick::default()
                    })
                    .await?;
                }
                Action::Log(level, message) => hook.on_log(*level, message),
                Action::Gate(gate) => gate.notified().await,
                Action::Fail(message) => return Err(EngineError::Other((*message).to_string())),
            }
        }
        Ok(self.info.clone())
    }
}

/// Hook that records what the engine reported and never pauses
#[derive(Default)]
pub struct RecordingHook {
    pub ticks: Mutex<Vec<ProgressTick>>,
    pub logs: Mutex<Vec<(LogLevel, String)>>,
    abort_after: Option<usize>,
}

impl RecordingHook {
    /// Abort the transfer once `ticks` progress reports were received
    pub fn aborting_after(ticks: usize) -> Self {
        Self {
            abort_after: Some(ticks),
            ..Self::default()
        }
    }

    pub fn ticks(&self) -> Vec<ProgressTick> {
        self.ticks.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressHook for RecordingHook {
    async fn on_progress(&self, tick: ProgressTick) -> Result<(), Aborted> {
        let mut ticks = self.ticks.lock().unwrap();
        ticks.push(tick);
        match self.abort_after {
            Some(limit) if ticks.len() >= limit => Err(Aborted),
            _ => Ok(()),
        }
    }

    fn on_log(&self, level: LogLevel, message: &str) {
        self.logs.lock().unwrap().push((level, message.to_string()));
    }
}
