// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rvt serve`: recovery sweep, then periodic workflow polling.
//!
//! The state directory is locked only while a sweep or poll runs, so
//! one-shot commands can interleave with the service.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use crate::app::build_controller;
use crate::config::Config;
use crate::state_lock::StateLock;

pub async fn serve(config: Config, state_dir: PathBuf) -> Result<()> {
    let poll_interval = Duration::from_secs(config.engine.poll_interval_secs.max(1));
    info!(
        state_dir = %state_dir.display(),
        poll_interval_secs = poll_interval.as_secs(),
        "rvt serve starting"
    );

    {
        let _lock = StateLock::acquire(&state_dir).await?;
        let ctl = build_controller(&config, &state_dir)?;
        match ctl.recover_stuck().await {
            Ok(recovered) if !recovered.is_empty() => {
                warn!(
                    count = recovered.len(),
                    ids = ?recovered,
                    "recovered interrupted submissions"
                )
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "recovery sweep failed"),
        }
        ctl.shutdown().await;
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Must be created outside the loop: select! re-evaluates its branches.
    let mut poll = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = poll.tick() => poll_once(&config, &state_dir).await,
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    info!("rvt serve stopped");
    Ok(())
}

async fn poll_once(config: &Config, state_dir: &std::path::Path) {
    let lock = match StateLock::try_acquire(state_dir) {
        Ok(Some(lock)) => lock,
        Ok(None) => {
            debug!("state dir busy, skipping poll");
            return;
        }
        Err(e) => {
            error!(error = %e, "cannot lock state dir");
            return;
        }
    };
    let ctl = match build_controller(config, state_dir) {
        Ok(ctl) => ctl,
        Err(e) => {
            error!(error = %e, "cannot open store");
            return;
        }
    };

    let refreshed = ctl.poll_submitted().await;
    info!(refreshed, "polled submitted relvals");
    debug!(
        locks = ?ctl.lock_status(),
        queued = ?ctl.queued_names(),
        workers = ?ctl.worker_status(),
        "engine status"
    );
    ctl.shutdown().await;
    drop(lock);
}
