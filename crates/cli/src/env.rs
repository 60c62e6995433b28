// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

// --- State directory ---

/// Resolve state directory: RVT_STATE_DIR > XDG_STATE_HOME/rvt > ~/.local/state/rvt
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RVT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rvt"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| anyhow!("cannot find a state directory: set RVT_STATE_DIR or HOME"))?;
    Ok(PathBuf::from(home).join(".local/state/rvt"))
}

// --- Config file ---

pub fn config_path() -> Option<PathBuf> {
    std::env::var("RVT_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

// --- Acting user ---

/// Name recorded in history entries: RVT_USER > USER > "unknown"
pub fn user() -> String {
    std::env::var("RVT_USER")
        .ok()
        .or_else(|| std::env::var("USER").ok())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}
