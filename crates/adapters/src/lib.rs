// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the build host, the job manager, the dataset
//! catalog and notifications

pub mod catalog;
mod env;
pub mod http;
pub mod jobs;
pub mod notify;
pub mod remote;
pub mod subprocess;
pub mod traced;

pub use catalog::{CatalogError, DatasetCatalog, DatasetRecord, RestDatasetCatalog};
pub use http::HttpConfig;
pub use jobs::{JobManager, JobManagerError, JobRecord, RestJobManager};
pub use notify::{
    Attachment, DesktopNotifyAdapter, NoOpNotifyAdapter, Notification, NotifyAdapter, NotifyError,
};
pub use remote::{CommandOutput, RemoteError, RemoteExecutor, SshConfig, SshExecutor};
pub use traced::{TracedCatalog, TracedJobManager, TracedRemote};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use catalog::{CatalogCall, FakeDatasetCatalog};
#[cfg(any(test, feature = "test-support"))]
pub use jobs::{FakeJobManager, JobCall};
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use remote::{FakeRemoteExecutor, RemoteCall};
