// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production wiring of the controller and its adapters.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rv_adapters::{
    DesktopNotifyAdapter, NoOpNotifyAdapter, Notification, NotifyAdapter, NotifyError,
    RestDatasetCatalog, RestJobManager, SshExecutor, TracedCatalog, TracedJobManager,
    TracedRemote,
};
use rv_core::SystemClock;
use rv_engine::{ControllerDeps, RelvalController};
use rv_storage::MemoryStore;

use crate::config::{Config, NotifyBackend};

/// Document snapshot inside the state directory.
pub const STORE_FILE: &str = "relvals.json";

pub type Controller = RelvalController<
    MemoryStore,
    TracedRemote<SshExecutor>,
    TracedJobManager<RestJobManager>,
    TracedCatalog<RestDatasetCatalog>,
    Notifier,
    SystemClock,
>;

/// Notification backend picked by `[notify] backend`.
#[derive(Clone, Debug)]
pub enum Notifier {
    Desktop(DesktopNotifyAdapter),
    None(NoOpNotifyAdapter),
}

impl Notifier {
    pub fn for_backend(backend: NotifyBackend) -> Self {
        match backend {
            NotifyBackend::Desktop => Notifier::Desktop(DesktopNotifyAdapter::new()),
            NotifyBackend::None => Notifier::None(NoOpNotifyAdapter::new()),
        }
    }
}

#[async_trait]
impl NotifyAdapter for Notifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Notifier::Desktop(adapter) => adapter.notify(notification).await,
            Notifier::None(adapter) => adapter.notify(notification).await,
        }
    }
}

/// Open the store under `state_dir` and start a controller on it.
///
/// Must be called inside the tokio runtime: the submission workers are
/// spawned here.
pub fn build_controller(config: &Config, state_dir: &Path) -> Result<Controller> {
    std::fs::create_dir_all(state_dir)
        .with_context(|| format!("cannot create state dir {}", state_dir.display()))?;
    let store = MemoryStore::open(&state_dir.join(STORE_FILE))?;
    let remote = TracedRemote::new(SshExecutor::new(config.ssh_config()));
    let jobs = TracedJobManager::new(RestJobManager::new(config.job_manager_http())?);
    let catalog = TracedCatalog::new(RestDatasetCatalog::new(config.catalog_http())?);
    let notifier = Notifier::for_backend(config.notify.backend);

    Ok(RelvalController::new(
        ControllerDeps {
            store,
            remote,
            jobs,
            catalog,
            notifier,
        },
        SystemClock,
        config.to_engine_config(),
    ))
}
