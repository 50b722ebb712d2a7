// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn failures_accumulate_until_reset() {
    let counters = SyncCounters::new();

    assert_eq!(counters.record_upload_failure(), 1);
    assert_eq!(counters.record_probe_failure(), 2);
    assert_eq!(counters.record_upload_failure(), 3);
    assert_eq!(counters.consecutive_failures(), 3);

    counters.reset_failures();
    assert_eq!(counters.consecutive_failures(), 0);

    let diag = Diagnostics::collect(ConnectionState::Disconnected, 0, 100, 0, 0, &counters);
    assert_eq!(diag.upload_failures, 2);
    assert_eq!(diag.probe_failures, 1);
}

#[test]
fn collect_reads_all_counters() {
    let counters = SyncCounters::new();
    counters.record_immediate();
    counters.record_batch(10);
    counters.record_batch(3);
    counters.record_dropped();

    let diag = Diagnostics::collect(ConnectionState::ServiceConnected, 4, 100, 2, 1, &counters);

    assert_eq!(diag.delivered_immediately, 1);
    assert_eq!(diag.delivered_batched, 13);
    assert_eq!(diag.dropped, 1);
    assert_eq!(diag.evicted, 2);
    assert_eq!(diag.corrupt_skipped, 1);
}

#[test]
fn serializes_state_name() {
    let diag = Diagnostics::collect(
        ConnectionState::NetworkConnected,
        7,
        100,
        0,
        0,
        &SyncCounters::new(),
    );
    let json = serde_json::to_value(&diag).unwrap();

    assert_eq!(json["connection_state"], "NETWORK_CONNECTED");
    assert_eq!(json["queue_size"], 7);
}

#[test]
fn display_lists_every_counter() {
    let diag = Diagnostics::collect(
        ConnectionState::ServiceConnected,
        3,
        100,
        1,
        2,
        &SyncCounters::new(),
    );
    let text = diag.to_string();

    assert!(text.contains("connection:  SERVICE_CONNECTED"));
    assert!(text.contains("queue:       3/100"));
    assert!(text.contains("evicted:     1"));
    assert!(text.contains("corrupt:     2"));
    assert!(text.contains("dropped:     0"));
}
