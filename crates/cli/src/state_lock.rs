// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive use of the state directory across rvt processes.
//!
//! The document store lives in memory and rewrites its snapshot on every
//! save, so only one process may have it open at a time.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

pub const LOCK_FILE: &str = "rvt.pid";

/// Held for as long as the process works on the store; released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
}

fn open(state_dir: &Path) -> Result<(File, PathBuf)> {
    std::fs::create_dir_all(state_dir)
        .with_context(|| format!("cannot create state dir {}", state_dir.display()))?;
    let path = state_dir.join(LOCK_FILE);
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok((file, path))
}

impl StateLock {
    /// Take the lock, or `None` if another process holds it.
    pub fn try_acquire(state_dir: &Path) -> Result<Option<Self>> {
        let (file, _) = open(state_dir)?;
        if file.try_lock_exclusive().is_err() {
            return Ok(None);
        }
        Self::claimed(file).map(Some)
    }

    /// Take the lock, waiting for the current holder if there is one.
    pub async fn acquire(state_dir: &Path) -> Result<Self> {
        if let Some(lock) = Self::try_acquire(state_dir)? {
            return Ok(lock);
        }
        let (file, path) = open(state_dir)?;
        let holder = std::fs::read_to_string(&path).unwrap_or_default();
        eprintln!(
            "waiting for rvt process {} to release {}",
            holder.trim(),
            state_dir.display()
        );
        let file = tokio::task::spawn_blocking(move || file.lock_exclusive().map(|()| file))
            .await?
            .with_context(|| format!("cannot lock {}", path.display()))?;
        Self::claimed(file)
    }

    fn claimed(mut file: File) -> Result<Self> {
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "state_lock_tests.rs"]
mod tests;
