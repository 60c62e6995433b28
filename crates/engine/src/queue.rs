// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded task queue drained by a fixed pool of workers.
//!
//! Tasks are named futures. A name is admitted at most once while a task of
//! that name is queued or running, so enqueueing is idempotent per name.
//! Each task runs in its own spawned tokio task: an error or a panic is
//! logged and the worker moves on to the next item.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Outcome of a task body
pub type TaskResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("task queue is full ({0} tasks waiting)")]
    Full(usize),
    #[error("task queue is shut down")]
    Closed,
}

/// Result of a successful [`TaskQueue::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// A task with the same name is already queued or running.
    Duplicate,
}

/// What one worker is doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    pub worker_id: usize,
    pub current_task: Option<String>,
    /// Set while the worker waits for work.
    pub idle_since: Option<Instant>,
}

struct QueueState {
    pending: VecDeque<(String, TaskFuture)>,
    running: HashSet<String>,
    workers: Vec<WorkerStatus>,
    closed: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Notify,
    capacity: usize,
}

/// Handle to the queue and its workers. Clones share the same pool.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TaskQueue {
    /// Spawn `workers` workers on the current tokio runtime.
    pub fn start(workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let now = Instant::now();
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                running: HashSet::new(),
                workers: (0..workers)
                    .map(|worker_id| WorkerStatus {
                        worker_id,
                        current_task: None,
                        idle_since: Some(now),
                    })
                    .collect(),
                closed: false,
            }),
            available: Notify::new(),
            capacity,
        });
        let handles = (0..workers)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                tokio::spawn(
                    worker_loop(worker_id, shared)
                        .instrument(tracing::info_span!("worker", worker_id)),
                )
            })
            .collect();
        tracing::info!(workers, capacity, "task queue started");
        Self {
            shared,
            handles: Arc::new(Mutex::new(handles)),
        }
    }

    /// Enqueue `task` under `name` unless that name is already queued or running.
    pub fn submit<F>(&self, name: &str, task: F) -> Result<SubmitOutcome, QueueError>
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            if state.running.contains(name) || state.pending.iter().any(|(n, _)| n == name) {
                tracing::debug!(task = name, "duplicate task ignored");
                return Ok(SubmitOutcome::Duplicate);
            }
            if state.pending.len() >= self.shared.capacity {
                return Err(QueueError::Full(state.pending.len()));
            }
            state.pending.push_back((name.to_string(), Box::pin(task)));
            tracing::debug!(task = name, queued = state.pending.len(), "task queued");
        }
        self.shared.available.notify_one();
        Ok(SubmitOutcome::Queued)
    }

    /// Names waiting for a worker, in queue order.
    pub fn queued_names(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .pending
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn worker_status(&self) -> Vec<WorkerStatus> {
        self.shared.state.lock().workers.clone()
    }

    /// Whether a task named `name` is queued or running.
    pub fn is_active(&self, name: &str) -> bool {
        let state = self.shared.state.lock();
        state.running.contains(name) || state.pending.iter().any(|(n, _)| n == name)
    }

    /// Stop accepting tasks, let workers drain the queue, and wait for them.
    ///
    /// Running tasks are not interrupted.
    pub async fn shutdown(&self) {
        self.shared.state.lock().closed = true;
        self.shared.available.notify_waiters();
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker ended abnormally");
            }
        }
        tracing::info!("task queue stopped");
    }
}

async fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    loop {
        let available = shared.available.notified();
        let next = {
            let mut state = shared.state.lock();
            match state.pending.pop_front() {
                Some((name, task)) => {
                    state.running.insert(name.clone());
                    if let Some(worker) = state.workers.get_mut(worker_id) {
                        worker.current_task = Some(name.clone());
                        worker.idle_since = None;
                    }
                    Some((name, task))
                }
                None if state.closed => break,
                None => None,
            }
        };

        let Some((name, task)) = next else {
            available.await;
            continue;
        };

        let started = Instant::now();
        tracing::info!(task = %name, "task started");
        match tokio::spawn(task).await {
            Ok(Ok(())) => tracing::info!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            ),
            Ok(Err(e)) => tracing::error!(task = %name, error = %e, "task failed"),
            Err(e) => tracing::error!(task = %name, error = %e, "task panicked"),
        }

        let mut state = shared.state.lock();
        state.running.remove(&name);
        if let Some(worker) = state.workers.get_mut(worker_id) {
            worker.current_task = None;
            worker.idle_since = Some(Instant::now());
        }
    }
    tracing::debug!("worker exiting");
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
