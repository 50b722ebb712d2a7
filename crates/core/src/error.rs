// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for scan-core operations.

use thiserror::Error;

use crate::state::ConnectionState;

/// All possible errors that can occur in scan-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{field} is required\n  hint: scan events need a non-empty tokenId, deviceId and timestamp")]
    MissingField { field: &'static str },

    #[error("invalid connection transition: cannot go from {from} to {to}\n  hint: {to} is only reachable from NETWORK_CONNECTED")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for scan-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
