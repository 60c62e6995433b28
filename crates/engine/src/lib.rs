// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! RelVal lifecycle engine: locks, the submission queue, the state machine
//! and the controller that ties them to the adapters

mod config;
mod controller;
mod error;
mod lock;
mod machine;
mod queue;
pub mod scripts;

pub use config::{EngineConfig, RemoteSettings};
pub use controller::{BatchResult, ControllerDeps, RelvalController};
pub use error::ControllerError;
pub use lock::{AlreadyLocked, LockGuard, LockRegistry, LockStatus, DEFAULT_PRUNE_THRESHOLD};
pub use machine::{Origin, StateMachine, TransitionHooks};
pub use queue::{QueueError, SubmitOutcome, TaskQueue, TaskResult, WorkerStatus};
