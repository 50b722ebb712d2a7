// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator client: the single entry point for captured scans.
//!
//! Provides a high-level interface for:
//! - Recording scans (immediate send with durable queue fallback)
//! - Feeding link-up/link-down signals into the connection state
//! - Health probes and queue maintenance for the operator console
//! - Starting the background [`SyncWorker`]
//!
//! The client is constructed once by the process root and passed by
//! reference; there is no global instance.

use std::path::Path;
use std::sync::Arc;

use scan_core::{ConnectionState, ConnectionStateMachine, LinkEvent, ScanEvent};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::health::ProbeOutcome;
use super::queue::{DurableQueue, OpenReport, QueueOptions};
use super::transport::{Delivery, Endpoints, HttpTransport, Transport, TransportError};
use super::worker::{SyncShared, SyncWorker};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, SyncCounters};
use crate::error::Result;
use crate::storage::StorageMedium;

/// What happened to a recorded scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The orchestrator acknowledged it immediately.
    Delivered,
    /// Persisted in the queue for the sync worker. `evicted` is set when
    /// the oldest queued scan was dropped to make room.
    Queued { evicted: bool },
    /// Could not be sent or queued. Counted in [`Diagnostics::dropped`].
    Dropped,
}

/// Client for the orchestrator.
pub struct OrchestratorClient<T: Transport = HttpTransport> {
    shared: SyncShared<T>,
    device_id: String,
    team_id: Option<String>,
}

impl OrchestratorClient<HttpTransport> {
    /// Create a client that talks HTTP(S) to the configured orchestrator.
    pub fn new(config: &Config, queue_path: &Path, medium: StorageMedium) -> Result<Self> {
        let transport = HttpTransport::new(config.sync.accept_invalid_certs)?;
        Self::with_transport(config, transport, queue_path, medium)
    }
}

impl<T: Transport + 'static> OrchestratorClient<T> {
    /// Create a client with a custom transport (for testing).
    ///
    /// Opens the queue, rebuilding its count from disk. The connection
    /// state starts in `DISCONNECTED`.
    pub fn with_transport(
        config: &Config,
        transport: T,
        queue_path: &Path,
        medium: StorageMedium,
    ) -> Result<Self> {
        config.validate()?;
        let endpoints = Endpoints::new(&config.orchestrator_url, &config.device_id)?;
        let queue = DurableQueue::open(queue_path, medium, QueueOptions::from(&config.storage))?;

        let shared = SyncShared {
            transport: Arc::new(transport),
            queue: Arc::new(queue),
            state: Arc::new(ConnectionStateMachine::new()),
            counters: Arc::new(SyncCounters::new()),
            wake: Arc::new(Notify::new()),
            endpoints,
            config: config.sync.clone(),
        };

        Ok(OrchestratorClient {
            shared,
            device_id: config.device_id.clone(),
            team_id: config.team_id.clone(),
        })
    }

    /// Build a scan for `token_id` stamped with this device, its team and
    /// the current time.
    pub fn scan_event(&self, token_id: &str) -> Result<ScanEvent> {
        Ok(ScanEvent::now(
            token_id,
            self.team_id.clone(),
            &self.device_id,
        )?)
    }

    /// Deliver a scan, or queue it for the sync worker.
    ///
    /// Sends immediately only while `SERVICE_CONNECTED`, bounded by the
    /// request timeout. Any result other than 2xx or 409 falls back to the
    /// queue. A network failure also demotes the connection state.
    pub async fn record_scan(&self, event: &ScanEvent) -> RecordOutcome {
        let shared = &self.shared;

        if shared.state.is_service_reachable() {
            match self.send_now(event).await {
                Some(delivery) if delivery.is_acknowledged() => {
                    shared.counters.record_immediate();
                    tracing::info!(token = event.token_id(), %delivery, "scan delivered");
                    return RecordOutcome::Delivered;
                }
                Some(delivery) => {
                    tracing::warn!(token = event.token_id(), %delivery, "immediate send failed, queueing");
                    if matches!(delivery, Delivery::NetworkError(_)) {
                        shared.state.apply(LinkEvent::ProbeFailed);
                    }
                }
                None => {}
            }
        }

        let queued = event.clone();
        match shared.with_queue(move |q| q.append(&queued)).await {
            Ok(appended) => {
                tracing::info!(
                    token = event.token_id(),
                    queued = appended.len,
                    evicted = appended.evicted,
                    "scan queued"
                );
                RecordOutcome::Queued {
                    evicted: appended.evicted,
                }
            }
            Err(e) => {
                shared.counters.record_dropped();
                tracing::error!(token = event.token_id(), error = %e, "scan dropped: not sent and not queued");
                RecordOutcome::Dropped
            }
        }
    }

    async fn send_now(&self, event: &ScanEvent) -> Option<Delivery> {
        let shared = &self.shared;
        let body = match event.to_json() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize scan");
                return None;
            }
        };

        let timeout = shared.config.request_timeout();
        let send = shared.transport.post(shared.endpoints.scan(), body, timeout);
        let result = tokio::time::timeout(timeout, send)
            .await
            .unwrap_or(Err(TransportError::Timeout));
        Some(Delivery::classify(result))
    }

    /// Network link established: move to `NETWORK_CONNECTED` and probe.
    ///
    /// On a healthy probe the sync worker is woken so the backlog drains
    /// without waiting for the next interval.
    pub async fn link_up(&self) -> ProbeOutcome {
        self.shared.state.apply(LinkEvent::LinkUp);
        let outcome = self.probe().await;
        if outcome.is_healthy() {
            self.shared.wake.notify_one();
        }
        outcome
    }

    /// Network link lost.
    pub fn link_down(&self) {
        self.shared.state.apply(LinkEvent::LinkDown);
    }

    /// Probe `GET /health` now and update the connection state.
    pub async fn probe(&self) -> ProbeOutcome {
        self.shared.probe().await
    }

    /// Ask the sync worker to wake now.
    pub fn sync_now(&self) {
        self.shared.wake.notify_one();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// The state machine, for collaborators that report link changes directly.
    pub fn connection(&self) -> &ConnectionStateMachine {
        &self.shared.state
    }

    pub fn queue_size(&self) -> usize {
        self.shared.queue.len()
    }

    /// Up to `max` queued scans, oldest first, without removing them.
    ///
    /// Blocks on the storage medium; meant for the operator console.
    pub fn pending(&self, max: usize) -> Result<Vec<ScanEvent>> {
        Ok(self.shared.queue.read_batch(max)?)
    }

    /// Delete every queued scan. Returns how many were discarded.
    ///
    /// Blocks on the storage medium; meant for the operator console.
    pub fn clear_queue(&self) -> Result<usize> {
        let discarded = self.shared.queue.len();
        self.shared.queue.clear()?;
        tracing::warn!(discarded, "queue cleared by operator");
        Ok(discarded)
    }

    /// What the queue found on disk when the client was created.
    pub fn open_report(&self) -> OpenReport {
        self.shared.queue.open_report()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let queue = &self.shared.queue;
        Diagnostics::collect(
            self.shared.state.get(),
            queue.len(),
            queue.capacity(),
            queue.evicted(),
            queue.corrupt_skipped(),
            &self.shared.counters,
        )
    }

    /// A worker sharing this client's queue, state and counters.
    pub fn sync_worker(&self) -> SyncWorker<T> {
        SyncWorker::new(self.shared.clone())
    }

    /// Start the sync worker on the tokio runtime.
    pub fn spawn_sync_worker(&self, cancel: CancellationToken) -> JoinHandle<()> {
        self.sync_worker().spawn(cancel)
    }
}
