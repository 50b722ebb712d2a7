// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use scan_core::ScanEvent;

use crate::config::Config;

pub const TEST_DEVICE: &str = "SCANNER_TEST";

/// Create a scan for the given token with a fixed timestamp.
pub fn make_scan(token: &str) -> ScanEvent {
    ScanEvent::new(token, None, TEST_DEVICE, "2026-01-01T00:00:00Z").unwrap()
}

/// Create scans `T1..=Tn`.
pub fn make_scans(n: usize) -> Vec<ScanEvent> {
    (1..=n).map(|i| make_scan(&format!("T{i}"))).collect()
}

/// Config pointing at `url` with delays shortened for tests.
pub fn test_config(url: &str) -> Config {
    let mut config = Config::new(url, TEST_DEVICE, None).unwrap();
    config.sync.interval_secs = 1;
    config.sync.inter_batch_delay_ms = 0;
    config.sync.request_timeout_ms = 500;
    config.sync.probe_timeout_ms = 500;
    config.sync.batch_timeout_ms = 500;
    config
}

/// Token ids in order.
pub fn tokens(scans: &[ScanEvent]) -> Vec<String> {
    scans.iter().map(|s| s.token_id().to_string()).collect()
}
