// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::path::PathBuf;

fn program(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// ssh client binary (default: `ssh` on PATH).
pub fn ssh_program() -> PathBuf {
    program("RVT_SSH", "ssh")
}

/// scp client binary (default: `scp` on PATH).
pub fn scp_program() -> PathBuf {
    program("RVT_SCP", "scp")
}
