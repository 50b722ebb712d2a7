// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! scan-core: Shared types for scansync
//!
//! This crate provides the scan event model, the connection state machine
//! and the orchestrator protocol types used by both the `scansync` client
//! library and the `scansyncd` daemon.

pub mod error;
pub mod event;
pub mod protocol;
pub mod state;

pub use error::{Error, Result};
pub use event::ScanEvent;
pub use protocol::{BatchRequest, HealthStatus};
pub use state::{ConnectionState, ConnectionStateMachine, LinkEvent, Transition};
