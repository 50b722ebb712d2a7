// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! scansyncd - The scan delivery daemon.
//!
//! Owns the durable scan queue under `~/.local/state/scansync/`, runs the
//! background sync worker and reads operator commands and scan events from
//! stdin, one per line.
//!
//! Usage:
//!   scansyncd [--state-dir <path>] [--config <path>] [--link-up] [--verbose]

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use scansync::{Config, OrchestratorClient, StorageMedium};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

mod console;
mod env;

use console::{Command, Flow};

/// Lock filename for single instance guarantee.
const LOCK_NAME: &str = "scansyncd.lock";
/// Log filename within the state directory.
const LOG_NAME: &str = "scansyncd.log";
/// Config filename used when neither flag nor environment names one.
const CONFIG_NAME: &str = "scansync.toml";

#[derive(Parser)]
#[command(name = "scansyncd", version)]
#[command(about = "Store-and-forward delivery of scan events to the orchestrator")]
struct Args {
    /// State directory holding the queue, log and lock
    #[arg(long, value_name = "PATH")]
    state_dir: Option<PathBuf>,

    /// Config file (default: <state-dir>/scansync.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Treat the network link as up at startup and probe immediately
    #[arg(long)]
    link_up: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum DaemonError {
    #[error("cannot create state directory {path}: {source}")]
    StateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to acquire lock: {0}")]
    Lock(std::io::Error),

    #[error(transparent)]
    Client(#[from] scansync::Error),

    #[error("console i/o: {0}")]
    Console(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("{e}");
        eprintln!("scansyncd: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), DaemonError> {
    let state_dir = resolve_state_dir(args.state_dir);
    fs::create_dir_all(&state_dir).map_err(|source| DaemonError::StateDir {
        path: state_dir.clone(),
        source,
    })?;

    setup_logging(&state_dir.join(LOG_NAME), args.verbose);
    tracing::info!("scansyncd starting, state_dir={}", state_dir.display());

    let lock_file = acquire_lock(&state_dir.join(LOCK_NAME)).map_err(DaemonError::Lock)?;

    let config_path = args
        .config
        .or_else(env::config_path)
        .unwrap_or_else(|| state_dir.join(CONFIG_NAME));
    let config = Config::load(&config_path)?;
    tracing::info!(
        "device {} -> {} (config {})",
        config.device_id,
        config.orchestrator_url,
        config_path.display()
    );

    let client = OrchestratorClient::new(
        &config,
        &config.queue_path(&state_dir),
        StorageMedium::new(),
    )?;
    let report = client.open_report();
    tracing::info!(
        "queue opened with {} scans ({} corrupt lines, {} trimmed to capacity, oversized reset: {})",
        report.records,
        report.corrupt_lines,
        report.trimmed,
        report.recovered_oversized
    );

    let cancel = CancellationToken::new();
    let worker = client.spawn_sync_worker(cancel.clone());

    if args.link_up {
        let probe = client.link_up().await;
        tracing::info!("initial link up: {:?}", probe);
    }

    let result = console_loop(&client).await;

    cancel.cancel();
    if let Err(e) = worker.await {
        tracing::warn!("sync worker ended abnormally: {e}");
    }
    drop(lock_file);
    tracing::info!("scansyncd stopped");
    result
}

/// Read commands from stdin until EOF, `quit` or Ctrl-C.
async fn console_loop(client: &OrchestratorClient) -> Result<(), DaemonError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                return Ok(());
            }
        };
        let Some(line) = line else {
            tracing::info!("stdin closed");
            return Ok(());
        };

        let reply = match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => match console::execute(client, command).await {
                Flow::Continue(reply) => reply,
                Flow::Quit => return Ok(()),
            },
            Err(e) => format!("error: {e}"),
        };

        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
}

fn resolve_state_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    if let Some(dir) = env::xdg_state_home() {
        return dir.join("scansync");
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state/scansync"))
        .unwrap_or_else(|| PathBuf::from(".local/state/scansync"))
}

fn setup_logging(log_path: &Path, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = if env::has_log_filter() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    } else {
        EnvFilter::new(default_level)
    };

    // Try to open log file, fall back to stderr
    if let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn acquire_lock(lock_path: &Path) -> std::io::Result<fs::File> {
    use fs2::FileExt;

    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| std::io::Error::other("another scansyncd instance owns this state directory"))?;
    Ok(file)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
