// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// Poll `condition` until it holds or a second passes.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A task that counts its runs and finishes once `release` fires.
fn gated(counter: &Arc<AtomicUsize>) -> (impl Future<Output = TaskResult>, oneshot::Sender<()>) {
    let (release, gate) = oneshot::channel::<()>();
    let counter = Arc::clone(counter);
    let task = async move {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = gate.await;
        Ok(())
    };
    (task, release)
}

fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = TaskResult> {
    let counter = Arc::clone(counter);
    async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn submitted_task_runs() {
    let queue = TaskQueue::start(2, 8);
    let runs = Arc::new(AtomicUsize::new(0));

    assert_eq!(
        queue.submit("R-00001", counting(&runs)).unwrap(),
        SubmitOutcome::Queued
    );
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;
    wait_until(|| !queue.is_active("R-00001")).await;
}

#[tokio::test]
async fn duplicate_name_while_running_is_ignored() {
    let queue = TaskQueue::start(1, 8);
    let runs = Arc::new(AtomicUsize::new(0));
    let (task, release) = gated(&runs);

    queue.submit("R-00001", task).unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;

    let outcome = queue.submit("R-00001", counting(&runs)).unwrap();
    assert_eq!(outcome, SubmitOutcome::Duplicate);

    release.send(()).unwrap();
    wait_until(|| !queue.is_active("R-00001")).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_name_while_queued_is_ignored() {
    let queue = TaskQueue::start(1, 8);
    let runs = Arc::new(AtomicUsize::new(0));
    let (blocker, release) = gated(&runs);
    queue.submit("blocker", blocker).unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;

    let late = Arc::new(AtomicUsize::new(0));
    assert_eq!(
        queue.submit("R-00002", counting(&late)).unwrap(),
        SubmitOutcome::Queued
    );
    assert_eq!(
        queue.submit("R-00002", counting(&late)).unwrap(),
        SubmitOutcome::Duplicate
    );
    assert_eq!(queue.queued_names(), vec!["R-00002".to_string()]);

    release.send(()).unwrap();
    wait_until(|| late.load(Ordering::SeqCst) == 1).await;
    wait_until(|| !queue.is_active("R-00002")).await;
    assert_eq!(late.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn same_name_runs_again_after_completion() {
    let queue = TaskQueue::start(1, 8);
    let runs = Arc::new(AtomicUsize::new(0));

    queue.submit("R-00001", counting(&runs)).unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1 && !queue.is_active("R-00001")).await;

    assert_eq!(
        queue.submit("R-00001", counting(&runs)).unwrap(),
        SubmitOutcome::Queued
    );
    wait_until(|| runs.load(Ordering::SeqCst) == 2).await;
}

#[tokio::test]
async fn failing_task_does_not_stop_worker() {
    let queue = TaskQueue::start(1, 8);
    let runs = Arc::new(AtomicUsize::new(0));

    queue
        .submit("broken", async {
            let result: TaskResult = Err("remote host unreachable".into());
            result
        })
        .unwrap();
    queue.submit("after", counting(&runs)).unwrap();

    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn panicking_task_does_not_stop_worker() {
    let queue = TaskQueue::start(1, 8);
    let runs = Arc::new(AtomicUsize::new(0));

    queue
        .submit("explodes", async {
            let outcome: Option<TaskResult> = None;
            outcome.unwrap_or_else(|| panic!("boom"))
        })
        .unwrap();
    queue.submit("after", counting(&runs)).unwrap();

    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;
    wait_until(|| !queue.is_active("explodes")).await;
}

#[tokio::test]
async fn full_queue_rejects_new_names() {
    let queue = TaskQueue::start(1, 1);
    let runs = Arc::new(AtomicUsize::new(0));
    let (blocker, release) = gated(&runs);
    queue.submit("running", blocker).unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;

    queue.submit("waiting", counting(&runs)).unwrap();
    let err = queue.submit("overflow", counting(&runs)).unwrap_err();
    assert_eq!(err, QueueError::Full(1));

    release.send(()).unwrap();
}

#[tokio::test]
async fn worker_status_reports_current_task() {
    let queue = TaskQueue::start(2, 8);
    let runs = Arc::new(AtomicUsize::new(0));
    let (task, release) = gated(&runs);

    let before = queue.worker_status();
    assert_eq!(before.len(), 2);
    assert!(before.iter().all(|w| w.current_task.is_none() && w.idle_since.is_some()));

    queue.submit("R-00009", task).unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;

    let busy: Vec<_> = queue
        .worker_status()
        .into_iter()
        .filter(|w| w.current_task.as_deref() == Some("R-00009"))
        .collect();
    assert_eq!(busy.len(), 1);
    assert!(busy[0].idle_since.is_none());

    release.send(()).unwrap();
    wait_until(|| queue.worker_status().iter().all(|w| w.current_task.is_none())).await;
}

#[tokio::test]
async fn shutdown_drains_queue() {
    let queue = TaskQueue::start(1, 16);
    let runs = Arc::new(AtomicUsize::new(0));
    for i in 0..5 {
        let runs = Arc::clone(&runs);
        queue
            .submit(&format!("task-{i}"), async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    }

    queue.shutdown().await;
    assert_eq!(runs.load(Ordering::SeqCst), 5);
    assert_eq!(
        queue.submit("late", counting(&runs)).unwrap_err(),
        QueueError::Closed
    );
}
