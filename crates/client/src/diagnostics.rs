// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Counters exposed to the operator console.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use scan_core::ConnectionState;
use serde::Serialize;

/// Delivery counters shared by the capture path and the sync worker.
#[derive(Debug, Default)]
pub struct SyncCounters {
    delivered_immediately: AtomicU64,
    delivered_batched: AtomicU64,
    upload_failures: AtomicU64,
    probe_failures: AtomicU64,
    dropped: AtomicU64,
    /// Failed wakes since the last successful one; drives backoff.
    consecutive_failures: AtomicU32,
}

impl SyncCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_immediate(&self) {
        self.delivered_immediately.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, count: usize) {
        self.delivered_batched
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Returns the consecutive failure count including this one.
    pub fn record_upload_failure(&self) -> u32 {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
        self.bump_consecutive()
    }

    /// Returns the consecutive failure count including this one.
    pub fn record_probe_failure(&self) -> u32 {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
        self.bump_consecutive()
    }

    /// A scan lost because both delivery and the queue failed.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn bump_consecutive(&self) -> u32 {
        self.consecutive_failures
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }
}

/// Point-in-time view of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub connection_state: ConnectionState,
    pub queue_size: usize,
    pub queue_capacity: usize,
    /// Scans evicted by queue overflow.
    pub evicted: u64,
    /// Corrupt queue lines skipped while reading batches.
    pub corrupt_skipped: u64,
    pub delivered_immediately: u64,
    pub delivered_batched: u64,
    pub upload_failures: u64,
    pub probe_failures: u64,
    /// Scans lost because the send and the queue append both failed.
    pub dropped: u64,
    pub consecutive_failures: u32,
}

impl Diagnostics {
    pub(crate) fn collect(
        connection_state: ConnectionState,
        queue_size: usize,
        queue_capacity: usize,
        evicted: u64,
        corrupt_skipped: u64,
        counters: &SyncCounters,
    ) -> Self {
        Diagnostics {
            connection_state,
            queue_size,
            queue_capacity,
            evicted,
            corrupt_skipped,
            delivered_immediately: counters.delivered_immediately.load(Ordering::Relaxed),
            delivered_batched: counters.delivered_batched.load(Ordering::Relaxed),
            upload_failures: counters.upload_failures.load(Ordering::Relaxed),
            probe_failures: counters.probe_failures.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
            consecutive_failures: counters.consecutive_failures(),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "connection:  {}", self.connection_state)?;
        writeln!(f, "queue:       {}/{}", self.queue_size, self.queue_capacity)?;
        writeln!(
            f,
            "delivered:   {} immediate, {} batched",
            self.delivered_immediately, self.delivered_batched
        )?;
        writeln!(
            f,
            "failures:    {} upload, {} probe ({} consecutive)",
            self.upload_failures, self.probe_failures, self.consecutive_failures
        )?;
        writeln!(f, "evicted:     {}", self.evicted)?;
        writeln!(f, "corrupt:     {}", self.corrupt_skipped)?;
        write!(f, "dropped:     {}", self.dropped)
    }
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod tests;
