// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rv-core: data model and lifecycle tables for the RelVal tracker

pub mod clock;
pub mod id;
pub mod owner;
pub mod relval;
pub mod status;
pub mod time_fmt;
pub mod transition;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{prepid_namespace, RelvalId};
pub use owner::LockOwner;
pub use relval::{
    normalize_dataset, DriverSpec, GpuRequirement, GpuSpec, HistoryEntry, InputSpec,
    OutputDataset, Relval, Step, StepSpec, Workflow, WorkflowStatus, ARCHIVED_WORKFLOW_STATUSES,
    AUTO_CONDITIONS_PREFIX, COMPLETED_WORKFLOW_STATUS, DEAD_WORKFLOW_STATUSES,
    RUNNING_WORKFLOW_STATUSES, VALID_ACCESS_TYPE,
};
pub use status::{RelvalStatus, Trigger, UnknownStatus};
pub use time_fmt::{format_age, format_elapsed};
pub use transition::{InvalidTransition, Lifecycle, RelvalLifecycle, Transition};
