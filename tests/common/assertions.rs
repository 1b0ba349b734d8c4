//! Event collection helpers for integration tests

use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use vkvideo_dl::{Outcome, ProgressEvent, ProgressStatus, TaskEvent};

/// Default upper bound for anything a test waits on
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read events until `Finished`, returning everything seen and the outcome
///
/// # Panics
/// If the channel closes early or nothing finishes within [`TEST_TIMEOUT`].
pub async fn collect_until_finished(
    events: &mut UnboundedReceiver<TaskEvent>,
) -> (Vec<TaskEvent>, Outcome) {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let mut seen = Vec::new();
        loop {
            match events.recv().await {
                Some(TaskEvent::Finished { outcome }) => {
                    seen.push(TaskEvent::Finished {
                        outcome: outcome.clone(),
                    });
                    return (seen, outcome);
                }
                Some(event) => seen.push(event),
                None => panic!("event channel closed before the task finished"),
            }
        }
    })
    .await
    .expect("task did not finish in time")
}

/// Wait for the next `downloading` event
pub async fn wait_for_tick(events: &mut UnboundedReceiver<TaskEvent>) -> ProgressEvent {
    tokio::time::timeout(TEST_TIMEOUT, async {
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
    .expect("no progress tick in time")
}

/// The `downloading` events among `events`
pub fn ticks(events: &[TaskEvent]) -> Vec<ProgressEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Progress { event } if event.status == ProgressStatus::Downloading => {
                Some(event.clone())
            }
            _ => None,
        })
        .collect()
}

/// Texts of message events with the given status
pub fn messages(events: &[TaskEvent], status: ProgressStatus) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Progress { event } if event.status == status => event.text.clone(),
            _ => None,
        })
        .collect()
}
