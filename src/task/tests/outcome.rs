use crate::engine::MediaInfo;
use crate::task::DownloadTask;
use crate::task::test_helpers::{Step, StubEngine, join, next_tick, task_with, test_url};
use crate::types::{Outcome, TaskState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::test]
async fn test_success_without_output_dir_resolves_against_cwd() {
    let (task, _events) = task_with(Arc::new(StubEngine::new(vec![Step::Tick(50.0)])));

    task.start().unwrap();
    let outcome = join(&task).await;

    let expected = std::env::current_dir().unwrap().join("clip.mp4");
    assert_eq!(outcome, Outcome::Completed { path: expected });
}

#[tokio::test]
async fn test_success_with_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(StubEngine::new(vec![]).with_info(MediaInfo {
        title: "Концерт".into(),
        extension: "webm".into(),
        file_path: None,
    }));
    let (task, _events) = DownloadTask::new(test_url(), Some(dir.path().to_path_buf()), engine);

    task.start().unwrap();
    assert_eq!(
        join(&task).await.path(),
        Some(&dir.path().join("Концерт.webm"))
    );
}

#[tokio::test]
async fn test_engine_reported_path_wins() {
    let engine = Arc::new(StubEngine::new(vec![]).with_info(MediaInfo {
        title: "clip".into(),
        extension: "mp4".into(),
        file_path: Some(PathBuf::from("/srv/videos/clip [100_200].mp4")),
    }));
    let (task, _events) = task_with(engine);

    task.start().unwrap();
    assert_eq!(
        join(&task).await.path(),
        Some(&PathBuf::from("/srv/videos/clip [100_200].mp4"))
    );
}

#[tokio::test]
async fn test_engine_error_fails_with_sanitized_detail() {
    let (task, _events) = task_with(Arc::new(StubEngine::new(vec![
        Step::Tick(3.0),
        Step::Fail("\x1b[0;31mERROR:\x1b[0m Video is private"),
    ])));

    task.start().unwrap();
    assert_eq!(
        join(&task).await,
        Outcome::Failed {
            detail: "ERROR: Video is private".into()
        }
    );

    let snapshot = task.snapshot();
    assert_eq!(snapshot.state, TaskState::Failed);
    assert_eq!(
        snapshot.error_detail.as_deref(),
        Some("ERROR: Video is private")
    );
    assert!(snapshot.result_path.is_none());
}

#[tokio::test]
async fn test_prepare_failure_is_reported_as_failed() {
    let engine = Arc::new(StubEngine::new(vec![Step::Tick(1.0)]).failing_prepare("no network"));
    let (task, _events) = task_with(engine.clone());

    task.start().unwrap();
    match join(&task).await {
        Outcome::Failed { detail } => {
            assert!(detail.contains("not installed"), "detail was {detail:?}");
            assert!(detail.contains("no network"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        engine.fetch_calls.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "fetch must not run when preparation fails"
    );
}

#[tokio::test]
async fn test_engine_panic_is_reported_as_failed() {
    let (task, _events) = task_with(Arc::new(StubEngine::new(vec![Step::Panic])));

    task.start().unwrap();
    match join(&task).await {
        Outcome::Failed { detail } => {
            assert!(detail.contains("panicked"), "detail was {detail:?}");
            assert!(detail.contains("stub engine exploded"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_engine_error_while_cancelling_is_cancelled() {
    let gate = Arc::new(Notify::new());
    let (task, mut events) = task_with(Arc::new(StubEngine::new(vec![
        Step::Tick(1.0),
        Step::Wait(gate.clone()),
        Step::Fail("connection reset"),
    ])));

    task.start().unwrap();
    next_tick(&mut events).await;
    task.cancel();
    gate.notify_one();

    assert_eq!(
        join(&task).await,
        Outcome::Cancelled,
        "a user cancel must never surface as a failure"
    );
}

#[tokio::test]
async fn test_unrequested_abort_is_a_failure() {
    let (task, _events) = task_with(Arc::new(StubEngine::new(vec![Step::Abort])));

    task.start().unwrap();
    assert_eq!(
        join(&task).await,
        Outcome::Failed {
            detail: "download aborted".into()
        }
    );
}

#[tokio::test]
async fn test_success_after_unobserved_cancel_is_completed() {
    let gate = Arc::new(Notify::new());
    let (task, mut events) = task_with(Arc::new(StubEngine::new(vec![
        Step::Tick(99.0),
        Step::Wait(gate.clone()),
    ])));

    task.start().unwrap();
    next_tick(&mut events).await;
    task.cancel();
    gate.notify_one();

    // No progress tick observed the request before the file was saved
    assert!(join(&task).await.is_ok());
    assert_eq!(task.state(), TaskState::Completed);
}

#[tokio::test]
async fn test_snapshot_tracks_progress_and_timestamps() {
    let (task, _events) = task_with(Arc::new(StubEngine::new(vec![
        Step::TickWith(42.0, "1.00MiB/s", "00:05"),
    ])));

    let idle = task.snapshot();
    assert_eq!(idle.state, TaskState::Idle);
    assert!(idle.started_at.is_none());
    assert!(idle.progress.is_none());

    task.start().unwrap();
    join(&task).await;

    let done = task.snapshot();
    assert_eq!(done.state, TaskState::Completed);
    assert_eq!(done.url.as_str(), "https://vk.com/video-100_200");
    assert_eq!(done.progress.as_ref().and_then(|p| p.percent), Some(42.0));
    assert_eq!(
        done.progress.as_ref().and_then(|p| p.speed.as_deref()),
        Some("1.00MiB/s")
    );
    let started = done.started_at.unwrap();
    let finished = done.finished_at.unwrap();
    assert!(finished >= started);
    assert!(done.result_path.is_some());
}
