// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{QueueError, TransportError};

/// All possible errors that can occur while setting up or operating scansync.
///
/// The scan path itself never surfaces these: `record_scan` and the sync
/// worker turn failures into outcomes and counters. These errors come from
/// construction, configuration and operator commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Core(#[from] scan_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for scansync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
