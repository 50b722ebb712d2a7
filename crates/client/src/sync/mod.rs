// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Store-and-forward delivery of scans to the orchestrator.
//!
//! # Architecture
//!
//! ```text
//!   record_scan()
//!        │
//!        ▼
//! ┌──────────────┐  SERVICE_CONNECTED  ┌─────────────┐     ┌──────────────┐
//! │    Client    │────────────────────►│  Transport  │────►│ Orchestrator │
//! │(Orchestrator │                     │   (trait)   │◄────│   (HTTP)     │
//! │   Client)    │                     └─────────────┘     └──────────────┘
//! └──────────────┘                            ▲
//!        │ otherwise                          │ batches
//!        ▼                                    │
//! ┌──────────────┐   read / remove     ┌─────────────┐
//! │    Queue     │◄────────────────────│ SyncWorker  │
//! │(DurableQueue)│                     │ (background)│
//! └──────────────┘                     └─────────────┘
//! ```
//!
//! # Features
//!
//! - Immediate send while the orchestrator is reachable
//! - Bounded JSONL queue with oldest-first eviction and corruption tolerance
//! - Health probes driving the connection state machine
//! - Batch drain with exponential backoff between failed wakes
//! - Injectable transport trait for testing

mod client;
mod health;
mod queue;
mod transport;
mod worker;

pub use client::{OrchestratorClient, RecordOutcome};
pub use health::ProbeOutcome;
pub use queue::{Appended, DurableQueue, OpenReport, QueueError, QueueOptions, QueueResult};
pub use transport::{
    Delivery, Endpoints, HttpResponse, HttpTransport, Transport, TransportError, TransportFuture,
    TransportResult,
};
pub use worker::{backoff_delay, SyncWorker, WakeOutcome};

#[cfg(test)]
mod test_helpers;


#[cfg(test)]
mod integration_tests;
