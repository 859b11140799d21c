// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: TEAVE_STATE_DIR > XDG_STATE_HOME/teave > ~/.local/state/teave
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TEAVE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("teave"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/teave"))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    std::env::var("TEAVE_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Capacity of the update broadcast channel. Slow subscribers past this
/// lag and miss frames; the store remains the source of truth.
pub fn update_buffer() -> usize {
    std::env::var("TEAVE_UPDATE_BUFFER")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(256)
}
