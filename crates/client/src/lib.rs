// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! scansync - Store-and-forward delivery of scan events.
//!
//! This crate lets a scanning device keep capturing while its link to the
//! orchestrator comes and goes. Scans are sent immediately when the
//! orchestrator is reachable and otherwise persisted to a bounded queue that
//! a background worker drains.
//!
//! # Main Components
//!
//! - [`OrchestratorClient`] - Entry point: records scans, takes link signals, exposes diagnostics
//! - [`DurableQueue`] - Bounded JSONL queue with oldest-first eviction
//! - [`SyncWorker`] - Background drain with health probes and backoff
//! - [`Transport`] / [`HttpTransport`] - The one request primitive every call goes through
//! - [`StorageMedium`] - Guard shared with every other user of the storage medium
//! - [`Config`] - Device configuration loaded from TOML
//!
//! # Usage
//!
//! ```rust,ignore
//! use scansync::{Config, OrchestratorClient, StorageMedium};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::load(&config_path)?;
//! let client = OrchestratorClient::new(&config, &config.queue_path(&state_dir), StorageMedium::new())?;
//!
//! let cancel = CancellationToken::new();
//! let worker = client.spawn_sync_worker(cancel.clone());
//!
//! client.link_up().await;
//! let scan = client.scan_event("kaa001")?;
//! client.record_scan(&scan).await;
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use scan_core::{ConnectionState, ScanEvent};
pub use storage::{StorageGuard, StorageMedium};
pub use sync::{
    DurableQueue, HttpTransport, OrchestratorClient, ProbeOutcome, RecordOutcome, SyncWorker,
    Transport,
};
