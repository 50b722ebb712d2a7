// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variables read by the daemon.

use std::path::PathBuf;

pub mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

fn non_empty_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `SCANSYNC_STATE_DIR`, if set.
pub fn state_dir() -> Option<PathBuf> {
    non_empty_path(names::SCANSYNC_STATE_DIR)
}

/// `SCANSYNC_CONFIG`, if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty_path(names::SCANSYNC_CONFIG)
}

/// `XDG_STATE_HOME`, if set.
pub fn xdg_state_home() -> Option<PathBuf> {
    non_empty_path(names::XDG_STATE_HOME)
}

/// True if `RUST_LOG` is set, in which case it overrides `--verbose`.
pub fn has_log_filter() -> bool {
    std::env::var_os(names::RUST_LOG).is_some()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
