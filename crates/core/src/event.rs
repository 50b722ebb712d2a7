// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scan events produced by the capture subsystem.
//!
//! A [`ScanEvent`] is one token read: which token, which team (if any), which
//! device saw it and when. Events are validated on construction and on
//! deserialization, so a queued line with an empty required field is
//! rejected the same way as malformed JSON.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single captured token read.
///
/// Immutable once constructed. `team_id` is normalized so that an empty
/// string and an absent value are the same thing, and it is omitted from
/// the JSON form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScanEvent", rename_all = "camelCase")]
pub struct ScanEvent {
    token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<String>,
    device_id: String,
    timestamp: String,
}

/// Wire shape accepted before validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScanEvent {
    token_id: String,
    #[serde(default)]
    team_id: Option<String>,
    device_id: String,
    timestamp: String,
}

impl TryFrom<RawScanEvent> for ScanEvent {
    type Error = Error;

    fn try_from(raw: RawScanEvent) -> Result<Self> {
        ScanEvent::new(raw.token_id, raw.team_id, raw.device_id, raw.timestamp)
    }
}

impl ScanEvent {
    /// Creates a scan event, validating the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if `token_id`, `device_id` or
    /// `timestamp` is empty.
    pub fn new(
        token_id: impl Into<String>,
        team_id: Option<String>,
        device_id: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<Self> {
        let token_id = token_id.into();
        let device_id = device_id.into();
        let timestamp = timestamp.into();

        if token_id.trim().is_empty() {
            return Err(Error::MissingField { field: "tokenId" });
        }
        if device_id.trim().is_empty() {
            return Err(Error::MissingField { field: "deviceId" });
        }
        if timestamp.trim().is_empty() {
            return Err(Error::MissingField { field: "timestamp" });
        }

        Ok(ScanEvent {
            token_id,
            team_id: team_id.filter(|t| !t.is_empty()),
            device_id,
            timestamp,
        })
    }

    /// Creates a scan event stamped with the current UTC time.
    pub fn now(
        token_id: impl Into<String>,
        team_id: Option<String>,
        device_id: impl Into<String>,
    ) -> Result<Self> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        Self::new(token_id, team_id, device_id, timestamp)
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Serializes the event to a single JSON line (no trailing newline).
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses an event from JSON, applying the same validation as [`ScanEvent::new`].
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
