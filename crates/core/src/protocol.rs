// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP protocol spoken with the orchestrator.
//!
//! - `GET /health?deviceId=<id>` answers `200 {status, version, uptime}`
//! - `POST /api/scan` takes a single [`ScanEvent`]
//! - `POST /api/scan/batch` takes a [`BatchRequest`]
//!
//! 2xx means accepted, 409 means the orchestrator already has the scan.

use serde::{Deserialize, Serialize};

use crate::event::ScanEvent;

/// Health probe endpoint.
pub const HEALTH_PATH: &str = "/health";
/// Single scan submission endpoint.
pub const SCAN_PATH: &str = "/api/scan";
/// Batch scan submission endpoint.
pub const BATCH_PATH: &str = "/api/scan/batch";

/// HTTP status the orchestrator uses for an already-recorded scan.
pub const STATUS_DUPLICATE: u16 = 409;

/// Body of a batch upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub transactions: Vec<ScanEvent>,
}

impl BatchRequest {
    pub fn new(transactions: Vec<ScanEvent>) -> Self {
        BatchRequest { transactions }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of a health response.
///
/// Every field is optional: only the status code decides health, the body
/// is informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
}

impl HealthStatus {
    /// Parses a health body, yielding defaults for anything unparsable.
    pub fn parse_lenient(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
