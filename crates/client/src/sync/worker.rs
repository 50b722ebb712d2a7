// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background worker that drains the durable queue.
//!
//! Each wake probes health (when a network link exists), then uploads
//! batches from the head of the queue while the orchestrator is reachable.
//! A batch is removed only after it is acknowledged; any failure leaves it
//! in place for the next wake. Between wakes the worker sleeps for the
//! base interval, doubled per consecutive failure up to `max_backoff`.
//!
//! The storage guard is taken inside each queue call and never held
//! across an upload. Queue calls run on the blocking pool, since they wait
//! for the shared medium and fsync.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use scan_core::{BatchRequest, ConnectionState, ConnectionStateMachine, LinkEvent};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::health::{self, ProbeOutcome};
use super::queue::{DurableQueue, QueueError, QueueResult};
use super::transport::{Delivery, Endpoints, Transport};
use crate::config::SyncConfig;
use crate::diagnostics::SyncCounters;

/// Largest shift applied to the base interval.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// What one wake did.
#[derive(Debug, Clone)]
pub enum WakeOutcome {
    /// The orchestrator is not reachable; nothing was uploaded.
    Unreachable(ConnectionState),
    /// Every attempted batch was acknowledged. `batches` is zero when the
    /// queue was already empty.
    Synced { batches: usize, uploaded: usize },
    /// A batch was not acknowledged and stays queued.
    UploadFailed { uploaded: usize, delivery: Delivery },
    /// The queue could not be read or rewritten.
    StorageFailed { uploaded: usize },
}

/// Everything the worker shares with the client facade.
pub(crate) struct SyncShared<T> {
    pub transport: Arc<T>,
    pub queue: Arc<DurableQueue>,
    pub state: Arc<ConnectionStateMachine>,
    pub counters: Arc<SyncCounters>,
    pub wake: Arc<Notify>,
    pub endpoints: Endpoints,
    pub config: SyncConfig,
}

impl<T: Transport> SyncShared<T> {
    /// Probe health, counting any failure toward backoff.
    pub async fn probe(&self) -> ProbeOutcome {
        let outcome = health::probe(
            self.transport.as_ref(),
            &self.endpoints,
            self.config.probe_timeout(),
            &self.state,
        )
        .await;
        if matches!(
            outcome,
            ProbeOutcome::Unhealthy { .. } | ProbeOutcome::Unreachable(_)
        ) {
            self.counters.record_probe_failure();
        }
        outcome
    }

    /// Run a queue operation on the blocking pool.
    pub async fn with_queue<R, F>(&self, op: F) -> QueueResult<R>
    where
        F: FnOnce(&DurableQueue) -> QueueResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let queue = Arc::clone(&self.queue);
        tokio::task::spawn_blocking(move || op(&queue))
            .await
            .map_err(|e| QueueError::Io(io::Error::other(e)))?
    }
}

impl<T> Clone for SyncShared<T> {
    fn clone(&self) -> Self {
        SyncShared {
            transport: Arc::clone(&self.transport),
            queue: Arc::clone(&self.queue),
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
            wake: Arc::clone(&self.wake),
            endpoints: self.endpoints.clone(),
            config: self.config.clone(),
        }
    }
}

/// Periodic uploader for queued scans.
pub struct SyncWorker<T: Transport> {
    shared: SyncShared<T>,
}

impl<T: Transport + 'static> SyncWorker<T> {
    pub(crate) fn new(shared: SyncShared<T>) -> Self {
        SyncWorker { shared }
    }

    /// Run the worker on the tokio runtime until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Wake loop. Stops between wakes, or during the pause between
    /// batches, once `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval = ?self.shared.config.interval(),
            batch_size = self.shared.config.batch_size,
            "sync worker started"
        );

        loop {
            let delay = self.next_delay();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.shared.wake.notified() => {
                    tracing::debug!("sync worker woken early");
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let outcome = self.run_once(&cancel).await;
            tracing::debug!(?outcome, "sync wake finished");
        }

        tracing::info!("sync worker stopped");
    }

    /// Perform a single wake: probe, then drain.
    pub async fn run_once(&self, cancel: &CancellationToken) -> WakeOutcome {
        let shared = &self.shared;

        if shared.state.has_network() {
            shared.probe().await;
        }

        if !shared.state.is_service_reachable() {
            return WakeOutcome::Unreachable(shared.state.get());
        }

        let mut batches = 0;
        let mut uploaded = 0;

        while batches < shared.config.max_batches_per_wake && !cancel.is_cancelled() {
            if batches > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(shared.config.inter_batch_delay()) => {}
                }
            }

            let batch_size = shared.config.batch_size;
            let batch = match shared.with_queue(move |q| q.read_batch(batch_size)).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read queue");
                    return WakeOutcome::StorageFailed { uploaded };
                }
            };
            if batch.is_empty() {
                break;
            }

            let body = match BatchRequest::new(batch.clone()).to_json() {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize batch");
                    return WakeOutcome::StorageFailed { uploaded };
                }
            };

            let result = shared
                .transport
                .post(shared.endpoints.batch(), body, shared.config.batch_timeout())
                .await;
            let delivery = Delivery::classify(result);

            if !delivery.is_acknowledged() {
                self.record_failure(&delivery);
                return WakeOutcome::UploadFailed { uploaded, delivery };
            }

            let delivered = batch.clone();
            match shared
                .with_queue(move |q| q.remove_delivered(&delivered))
                .await
            {
                Ok(removed) => {
                    tracing::info!(
                        count = batch.len(),
                        removed,
                        remaining = shared.queue.len(),
                        %delivery,
                        "batch uploaded"
                    );
                }
                Err(e) => {
                    // Still queued; the orchestrator will answer 409 next time.
                    tracing::error!(error = %e, "failed to remove uploaded batch");
                    return WakeOutcome::StorageFailed { uploaded };
                }
            }

            shared.counters.record_batch(batch.len());
            batches += 1;
            uploaded += batch.len();
        }

        shared.counters.reset_failures();
        WakeOutcome::Synced { batches, uploaded }
    }

    /// Delay before the next wake.
    pub fn next_delay(&self) -> Duration {
        backoff_delay(
            self.shared.config.interval(),
            self.shared.config.max_backoff(),
            self.shared.counters.consecutive_failures(),
            self.shared.state.has_network(),
        )
    }

    fn record_failure(&self, delivery: &Delivery) {
        let shared = &self.shared;
        let failures = shared.counters.record_upload_failure();

        match delivery {
            Delivery::Rejected { code, body } => {
                tracing::warn!(code, body = %body, "batch rejected, keeping scans queued");
            }
            other => {
                tracing::warn!(delivery = %other, failures, "batch upload failed");
            }
        }

        if delivery.is_unreachable() && failures >= shared.config.failure_threshold {
            let transition = shared.state.apply(LinkEvent::ProbeFailed);
            if transition.changed() {
                tracing::warn!(failures, "orchestrator marked unreachable after repeated failures");
            }
        }
    }
}

/// Base interval doubled per consecutive failure, capped at `max`.
///
/// Without a network link there is nothing to back off from.
pub fn backoff_delay(base: Duration, max: Duration, failures: u32, has_network: bool) -> Duration {
    if failures == 0 || !has_network {
        return base;
    }
    let factor = 1u32 << failures.min(MAX_BACKOFF_SHIFT);
    base.saturating_mul(factor).min(max.max(base))
}
