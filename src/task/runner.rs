//! Background unit: runs the engine and settles exactly one outcome

use super::Shared;
use super::hook::TaskHook;
use crate::engine::{FetchRequest, MediaInfo};
use crate::error::EngineError;
use crate::sanitize;
use crate::types::{Outcome, TaskEvent};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinError;

/// Run the engine for `shared` and record the outcome
///
/// The engine runs in its own spawned task so that a panic inside it is
/// reported as a failure instead of tearing down this unit.
pub(super) async fn run(shared: Arc<Shared>) {
    let engine = shared.engine.clone();
    let hook = TaskHook::new(shared.clone());
    let request = FetchRequest::new(shared.url.clone(), shared.output_dir.clone());

    let task = shared.clone();
    let fetch = tokio::spawn(async move {
        engine.prepare(&hook).await?;
        tracing::debug!(engine = engine.name(), url = %request.url, "engine ready");
        if !task.enter_running() {
            return Err(EngineError::Aborted);
        }
        engine.fetch(&request, &hook).await
    });

    let result = fetch.await;
    settle(&shared, result);
}

/// Map the engine result to the terminal outcome and publish it
fn settle(shared: &Shared, result: Result<Result<MediaInfo, EngineError>, JoinError>) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut control = shared.control();
    if control.outcome.is_some() {
        return;
    }

    let cancel_requested = control.cancel_requested;
    let outcome = match result {
        Ok(Ok(info)) => Outcome::Completed {
            path: info.resolve_path(shared.output_dir.as_deref(), &cwd),
        },
        Ok(Err(_)) | Err(_) if cancel_requested => Outcome::Cancelled,
        Ok(Err(error)) => Outcome::Failed {
            detail: sanitize::clean(&error.to_string()),
        },
        Err(join_error) => Outcome::Failed {
            detail: sanitize::clean(&describe_join_error(join_error)),
        },
    };

    control.starting = false;
    control.pause_requested = false;
    control.finished_at = Some(chrono::Utc::now());
    control.outcome = Some(outcome.clone());

    match &outcome {
        Outcome::Completed { path } => {
            tracing::info!(url = %shared.url, path = %path.display(), "download completed");
            shared.status(&format!("Video downloaded successfully: {}", path.display()));
        }
        Outcome::Cancelled => tracing::info!(url = %shared.url, "download cancelled"),
        Outcome::Failed { detail } => {
            tracing::error!(url = %shared.url, error = %detail, "download failed")
        }
    }

    shared.transition(&mut control, outcome.state());
    shared.emit(TaskEvent::Finished { outcome });
    drop(control);

    shared.finished.notify_waiters();
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_panic() {
        match panic_message(error.into_panic()) {
            Some(message) => format!("download engine panicked: {message}"),
            None => "download engine panicked".to_string(),
        }
    } else {
        "download engine was stopped".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}
