// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Device configuration.
//!
//! Configuration is stored as TOML and includes:
//! - `orchestrator_url`: base URL of the orchestrator (`http://` or `https://`)
//! - `device_id` / `team_id`: identifiers stamped on every scan
//! - `[sync]`: worker interval, batch size, timeouts and backoff
//! - `[storage]`: queue file location and capacity

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of queued scans kept on the device.
pub const MAX_QUEUE_SIZE: usize = 100;
/// Number of scans uploaded per batch request.
pub const BATCH_UPLOAD_SIZE: usize = 10;
/// Queue files larger than this are treated as corrupt on open.
pub const MAX_QUEUE_FILE_BYTES: u64 = 100 * 1024;

const MAX_DEVICE_ID_LENGTH: usize = 100;
const TEAM_ID_LENGTH: usize = 3;

/// Top-level device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the orchestrator, without a trailing path.
    pub orchestrator_url: String,
    /// Identifier of this scanner.
    pub device_id: String,
    /// Three-digit team identifier, if the device is assigned to a team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Background sync and HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base wake interval of the sync worker in seconds (default: 10).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Maximum scans per batch upload (default: 10).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Timeout for the immediate single-scan send in milliseconds (default: 5000).
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Timeout for `GET /health` in milliseconds (default: 5000).
    #[serde(default = "default_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Timeout for batch uploads in milliseconds (default: 5000).
    #[serde(default = "default_timeout_ms")]
    pub batch_timeout_ms: u64,
    /// Upper bound on the backoff delay in seconds (default: 300).
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Consecutive upload failures before the state degrades (default: 3).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Pause between consecutive batches within one wake in milliseconds (default: 1000).
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
    /// Maximum batches uploaded per wake (default: 10).
    #[serde(default = "default_max_batches_per_wake")]
    pub max_batches_per_wake: usize,
    /// Skip TLS certificate validation for self-signed local orchestrators.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Persistent queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Queue file, relative to the state directory unless absolute.
    #[serde(default = "default_queue_file")]
    pub queue_file: PathBuf,
    /// Maximum queued scans before the oldest is evicted (default: 100).
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Queue files above this size are discarded on open (default: 100 KiB).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_batch_size() -> usize {
    BATCH_UPLOAD_SIZE
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_backoff_secs() -> u64 {
    300
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_inter_batch_delay_ms() -> u64 {
    1_000
}

fn default_max_batches_per_wake() -> usize {
    10
}

fn default_queue_file() -> PathBuf {
    PathBuf::from("queue.jsonl")
}

fn default_max_queue_size() -> usize {
    MAX_QUEUE_SIZE
}

fn default_max_file_bytes() -> u64 {
    MAX_QUEUE_FILE_BYTES
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            request_timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_timeout_ms(),
            batch_timeout_ms: default_timeout_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            failure_threshold: default_failure_threshold(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            max_batches_per_wake: default_max_batches_per_wake(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            queue_file: default_queue_file(),
            max_queue_size: default_max_queue_size(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

impl Config {
    /// Creates a config with default sync and storage settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the values fail [`Config::validate`].
    pub fn new(
        orchestrator_url: impl Into<String>,
        device_id: impl Into<String>,
        team_id: Option<String>,
    ) -> Result<Self> {
        let config = Config {
            orchestrator_url: orchestrator_url.into(),
            device_id: device_id.into(),
            team_id,
            sync: SyncConfig::default(),
            storage: StorageConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses and validates TOML config content.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if config.team_id.as_deref() == Some("") {
            config.team_id = None;
        }
        config.validate()?;
        Ok(config)
    }

    /// Saves the config as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        let url = &self.orchestrator_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "invalid orchestrator_url '{url}': must start with http:// or https://"
            )));
        }

        if self.device_id.trim().is_empty() {
            return Err(Error::Config("device_id is required".to_string()));
        }
        if self.device_id.len() > MAX_DEVICE_ID_LENGTH {
            return Err(Error::Config(format!(
                "device_id too long ({} chars, max {MAX_DEVICE_ID_LENGTH})",
                self.device_id.len()
            )));
        }

        if let Some(team) = &self.team_id {
            if team.len() != TEAM_ID_LENGTH || !team.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::Config(format!(
                    "invalid team_id '{team}': must be exactly {TEAM_ID_LENGTH} digits"
                )));
            }
        }

        let sync = &self.sync;
        if sync.batch_size == 0 {
            return Err(Error::Config("sync.batch_size must be at least 1".to_string()));
        }
        if sync.request_timeout_ms == 0 || sync.probe_timeout_ms == 0 || sync.batch_timeout_ms == 0
        {
            return Err(Error::Config("sync timeouts must be non-zero".to_string()));
        }

        let storage = &self.storage;
        if storage.max_queue_size == 0 {
            return Err(Error::Config(
                "storage.max_queue_size must be at least 1".to_string(),
            ));
        }
        if sync.batch_size > storage.max_queue_size {
            return Err(Error::Config(format!(
                "sync.batch_size ({}) exceeds storage.max_queue_size ({})",
                sync.batch_size, storage.max_queue_size
            )));
        }

        Ok(())
    }

    /// Resolves the queue file against the state directory.
    pub fn queue_path(&self, state_dir: &Path) -> PathBuf {
        if self.storage.queue_file.is_absolute() {
            self.storage.queue_file.clone()
        } else {
            state_dir.join(&self.storage.queue_file)
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
