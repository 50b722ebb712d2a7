// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the sync module.
//!
//! These tests verify the complete store-and-forward flow including:
//! - Scans surviving a restart of the client
//! - Backlog delivery once the orchestrator becomes reachable
//! - Duplicate handling against a real HTTP orchestrator

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use scan_core::{ConnectionState, ScanEvent};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use super::client::{OrchestratorClient, RecordOutcome};
use super::test_helpers::{make_scan, make_scans, test_config, tokens};
use super::transport_tests::MockTransport;
use super::worker::WakeOutcome;
use crate::storage::StorageMedium;

/// In-memory orchestrator that records every distinct token.
#[derive(Clone, Default)]
struct Orchestrator {
    tokens: Arc<Mutex<Vec<String>>>,
}

impl Orchestrator {
    fn received(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    /// Returns true if the token was new.
    fn accept(&self, token: &str) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.iter().any(|t| t == token) {
            return false;
        }
        tokens.push(token.to_string());
        true
    }
}

#[derive(serde::Deserialize)]
struct Batch {
    transactions: Vec<ScanEvent>,
}

async fn spawn_orchestrator() -> (SocketAddr, Orchestrator) {
    async fn scan(State(orch): State<Orchestrator>, Json(event): Json<ScanEvent>) -> StatusCode {
        if orch.accept(event.token_id()) {
            StatusCode::CREATED
        } else {
            StatusCode::CONFLICT
        }
    }

    async fn batch(State(orch): State<Orchestrator>, Json(batch): Json<Batch>) -> StatusCode {
        let mut fresh = 0;
        for event in &batch.transactions {
            if orch.accept(event.token_id()) {
                fresh += 1;
            }
        }
        if fresh == 0 {
            StatusCode::CONFLICT
        } else {
            StatusCode::OK
        }
    }

    let orchestrator = Orchestrator::default();
    let app = Router::new()
        .route(
            "/health",
            get(|| async { r#"{"status":"ok","version":"1.0.0","uptime":1}"# }),
        )
        .route("/api/scan", post(scan))
        .route("/api/scan/batch", post(batch))
        .with_state(orchestrator.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, orchestrator)
}

/// A recorded scan is still queued exactly once after a restart.
#[tokio::test]
async fn test_queued_scans_survive_restart() {
    let dir = tempdir().unwrap();
    let queue_path = dir.path().join("queue.jsonl");
    let config = test_config("http://orchestrator.test");

    {
        let client = OrchestratorClient::with_transport(
            &config,
            MockTransport::new(),
            &queue_path,
            StorageMedium::new(),
        )
        .unwrap();
        for scan in make_scans(3) {
            client.record_scan(&scan).await;
        }
    }

    let client = OrchestratorClient::with_transport(
        &config,
        MockTransport::new(),
        &queue_path,
        StorageMedium::new(),
    )
    .unwrap();

    assert_eq!(client.open_report().records, 3);
    assert_eq!(client.queue_size(), 3);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    let pending = tokens(&client.pending(10).unwrap());
    assert_eq!(pending, vec!["T1", "T2", "T3"]);
    let unique: HashSet<_> = pending.iter().collect();
    assert_eq!(unique.len(), 3);
}

/// Offline capture, link up, backlog delivered over real HTTP.
#[tokio::test]
async fn test_backlog_is_delivered_after_link_up() {
    let (addr, orchestrator) = spawn_orchestrator().await;
    let dir = tempdir().unwrap();
    let config = test_config(&format!("http://{addr}"));
    let client = OrchestratorClient::new(
        &config,
        &dir.path().join("queue.jsonl"),
        StorageMedium::new(),
    )
    .unwrap();

    for scan in make_scans(12) {
        assert_eq!(
            client.record_scan(&scan).await,
            RecordOutcome::Queued { evicted: false }
        );
    }

    assert!(client.link_up().await.is_healthy());
    assert_eq!(client.connection_state(), ConnectionState::ServiceConnected);

    let outcome = client.sync_worker().run_once(&CancellationToken::new()).await;
    assert!(matches!(
        outcome,
        WakeOutcome::Synced {
            batches: 2,
            uploaded: 12
        }
    ));
    assert_eq!(client.queue_size(), 0);

    let expected: Vec<String> = (1..=12).map(|i| format!("T{i}")).collect();
    assert_eq!(orchestrator.received(), expected);

    // Now connected: the next scan goes straight through
    assert_eq!(
        client.record_scan(&make_scan("T13")).await,
        RecordOutcome::Delivered
    );
    assert_eq!(client.queue_size(), 0);
}

/// A batch the orchestrator already has is acknowledged with 409 and removed.
#[tokio::test]
async fn test_duplicate_batch_is_removed() {
    let (addr, orchestrator) = spawn_orchestrator().await;
    let dir = tempdir().unwrap();
    let config = test_config(&format!("http://{addr}"));
    let client = OrchestratorClient::new(
        &config,
        &dir.path().join("queue.jsonl"),
        StorageMedium::new(),
    )
    .unwrap();

    for scan in make_scans(3) {
        orchestrator.accept(scan.token_id());
        client.record_scan(&scan).await;
    }

    client.link_up().await;
    let outcome = client.sync_worker().run_once(&CancellationToken::new()).await;

    assert!(matches!(outcome, WakeOutcome::Synced { uploaded: 3, .. }));
    assert_eq!(client.queue_size(), 0);
    assert_eq!(orchestrator.received().len(), 3);
}

/// Orchestrator gone: scans queue up and the worker reports it.
#[tokio::test]
async fn test_orchestrator_down_keeps_everything() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempdir().unwrap();
    let config = test_config(&format!("http://{addr}"));
    let client = OrchestratorClient::new(
        &config,
        &dir.path().join("queue.jsonl"),
        StorageMedium::new(),
    )
    .unwrap();

    assert!(!client.link_up().await.is_healthy());
    assert_eq!(client.connection_state(), ConnectionState::NetworkConnected);

    for scan in make_scans(5) {
        client.record_scan(&scan).await;
    }

    let outcome = client.sync_worker().run_once(&CancellationToken::new()).await;
    assert!(matches!(
        outcome,
        WakeOutcome::Unreachable(ConnectionState::NetworkConnected)
    ));
    assert_eq!(client.queue_size(), 5);
    assert!(client.diagnostics().probe_failures >= 2);
}
