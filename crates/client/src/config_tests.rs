// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

const MINIMAL: &str = r#"
orchestrator_url = "https://10.0.0.5:3000"
device_id = "SCANNER_AA11BB"
"#;

#[test]
fn minimal_config_uses_defaults() {
    let config = Config::parse(MINIMAL).unwrap();

    assert_eq!(config.orchestrator_url, "https://10.0.0.5:3000");
    assert_eq!(config.device_id, "SCANNER_AA11BB");
    assert_eq!(config.team_id, None);
    assert_eq!(config.sync.interval_secs, 10);
    assert_eq!(config.sync.batch_size, BATCH_UPLOAD_SIZE);
    assert_eq!(config.sync.request_timeout(), Duration::from_secs(5));
    assert_eq!(config.sync.failure_threshold, 3);
    assert!(!config.sync.accept_invalid_certs);
    assert_eq!(config.storage.max_queue_size, MAX_QUEUE_SIZE);
    assert_eq!(config.storage.max_file_bytes, MAX_QUEUE_FILE_BYTES);
    assert_eq!(config.storage.queue_file, PathBuf::from("queue.jsonl"));
}

#[test]
fn full_config_overrides_defaults() {
    let config = Config::parse(
        r#"
orchestrator_url = "http://orchestrator.local:3000"
device_id = "SCANNER_1"
team_id = "042"

[sync]
interval_secs = 30
batch_size = 5
request_timeout_ms = 2000
max_backoff_secs = 60
inter_batch_delay_ms = 0
accept_invalid_certs = true

[storage]
queue_file = "/data/queue.jsonl"
max_queue_size = 50
"#,
    )
    .unwrap();

    assert_eq!(config.team_id.as_deref(), Some("042"));
    assert_eq!(config.sync.interval(), Duration::from_secs(30));
    assert_eq!(config.sync.batch_size, 5);
    assert_eq!(config.sync.request_timeout(), Duration::from_millis(2000));
    assert_eq!(config.sync.probe_timeout(), Duration::from_millis(5000));
    assert_eq!(config.sync.max_backoff(), Duration::from_secs(60));
    assert_eq!(config.sync.inter_batch_delay(), Duration::ZERO);
    assert!(config.sync.accept_invalid_certs);
    assert_eq!(config.storage.max_queue_size, 50);
}

#[test]
fn empty_team_id_means_none() {
    let config = Config::parse(
        r#"
orchestrator_url = "https://x"
device_id = "SCANNER_1"
team_id = ""
"#,
    )
    .unwrap();
    assert_eq!(config.team_id, None);
}

#[parameterized(
    ftp_url = { "ftp://x", "SCANNER_1", None },
    bare_host = { "orchestrator.local", "SCANNER_1", None },
    empty_device = { "https://x", "", None },
    short_team = { "https://x", "SCANNER_1", Some("01") },
    alpha_team = { "https://x", "SCANNER_1", Some("0a1") },
    long_team = { "https://x", "SCANNER_1", Some("0001") },
)]
fn new_rejects_invalid_values(url: &str, device: &str, team: Option<&str>) {
    let result = Config::new(url, device, team.map(str::to_string));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn device_id_length_is_capped() {
    let long = "D".repeat(101);
    assert!(Config::new("https://x", long, None).is_err());
    assert!(Config::new("https://x", "D".repeat(100), None).is_ok());
}

#[test]
fn batch_larger_than_queue_is_rejected() {
    let mut config = Config::new("https://x", "SCANNER_1", None).unwrap();
    config.sync.batch_size = 200;
    assert!(config.validate().is_err());

    config.sync.batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn zero_timeout_is_rejected() {
    let mut config = Config::new("https://x", "SCANNER_1", None).unwrap();
    config.sync.batch_timeout_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let result = Config::parse("orchestrator_url = ");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
}

#[test]
fn missing_required_key_is_a_parse_error() {
    let result = Config::parse(r#"device_id = "SCANNER_1""#);
    assert!(matches!(result, Err(Error::ConfigParse(_))));
}

#[test]
fn save_and_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("scansync.toml");

    let mut config = Config::new("https://x:3000", "SCANNER_1", Some("007".to_string())).unwrap();
    config.sync.interval_secs = 15;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.orchestrator_url, "https://x:3000");
    assert_eq!(loaded.team_id.as_deref(), Some("007"));
    assert_eq!(loaded.sync.interval_secs, 15);
}

#[test]
fn load_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let result = Config::load(&temp.path().join("missing.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn queue_path_resolution() {
    let mut config = Config::new("https://x", "SCANNER_1", None).unwrap();
    let state_dir = Path::new("/var/lib/scansync");

    assert_eq!(
        config.queue_path(state_dir),
        PathBuf::from("/var/lib/scansync/queue.jsonl")
    );

    config.storage.queue_file = PathBuf::from("/sd/queue.jsonl");
    assert_eq!(config.queue_path(state_dir), PathBuf::from("/sd/queue.jsonl"));
}
