// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive access to the shared storage medium.
//!
//! The queue file lives on the same medium as assets read by other
//! subsystems (display images, audio clips). Every consumer clones one
//! [`StorageMedium`] and takes a [`StorageGuard`] around each I/O call. The
//! guard releases on drop, so early returns and `?` never leak the lock.
//!
//! Guards must never be held across an `.await` on the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Handle to the mutex guarding a physical storage medium.
///
/// Cloning yields another handle to the same mutex.
#[derive(Debug, Clone, Default)]
pub struct StorageMedium {
    lock: Arc<Mutex<()>>,
}

impl StorageMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the medium is free and returns a guard for it.
    ///
    /// `holder` names the caller in trace logs.
    pub fn lock(&self, holder: &'static str) -> StorageGuard<'_> {
        let waited = Instant::now();
        // A panic in another holder leaves no state behind the unit mutex.
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::trace!(
            holder,
            waited_us = waited.elapsed().as_micros() as u64,
            "storage acquired"
        );
        StorageGuard {
            _guard: guard,
            holder,
            acquired: Instant::now(),
        }
    }

    /// Returns a guard if the medium is free right now.
    pub fn try_lock(&self, holder: &'static str) -> Option<StorageGuard<'_>> {
        let guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => return None,
        };
        Some(StorageGuard {
            _guard: guard,
            holder,
            acquired: Instant::now(),
        })
    }
}

/// Scoped ownership of the storage medium.
pub struct StorageGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    holder: &'static str,
    acquired: Instant,
}

impl StorageGuard<'_> {
    pub fn holder(&self) -> &'static str {
        self.holder
    }
}

impl Drop for StorageGuard<'_> {
    fn drop(&mut self) {
        tracing::trace!(
            holder = self.holder,
            held_us = self.acquired.elapsed().as_micros() as u64,
            "storage released"
        );
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
