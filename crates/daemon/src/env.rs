// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variables read by the daemon.

use std::path::PathBuf;

/// Environment variable names.
pub mod names {
    pub const FIELDLINK_ROOT: &str = "FIELDLINK_ROOT";
    pub const XDG_STATE_HOME: &str = "XDG_STATE_HOME";
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Returns the value of `FIELDLINK_ROOT` if set.
pub fn root_dir() -> Option<PathBuf> {
    std::env::var(names::FIELDLINK_ROOT).ok().map(PathBuf::from)
}

/// Returns the value of `XDG_STATE_HOME` if set.
pub fn xdg_state_home() -> Option<PathBuf> {
    std::env::var(names::XDG_STATE_HOME).ok().map(PathBuf::from)
}

/// Default root directory when none is configured.
pub fn default_root_dir() -> PathBuf {
    if let Some(dir) = xdg_state_home() {
        return dir.join("fieldlink");
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state/fieldlink"))
        .unwrap_or_else(|| PathBuf::from(".local/state/fieldlink"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
