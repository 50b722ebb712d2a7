// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented operator console.
//!
//! Each stdin line is one command. A line starting with `{` is taken as a
//! JSON scan event from the capture subsystem; everything else is a
//! keyword command (see [`HELP`]).

use scansync::{OrchestratorClient, ProbeOutcome, RecordOutcome, ScanEvent, Transport};

/// Entries shown by a bare `queue`.
const DEFAULT_QUEUE_LIMIT: usize = 10;

pub const HELP: &str = "\
commands:
  {json}          record a scan event given as JSON
  scan <token>    record a scan for <token> stamped with this device
  link up         network link established (probes immediately)
  link down       network link lost
  probe           probe orchestrator health now
  sync            wake the sync worker now
  status [json]   show diagnostics
  queue [n]       show the first n queued scans (default 10)
  clear           delete every queued scan
  help            show this help
  quit            stop the daemon";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scan event supplied whole.
    Event(ScanEvent),
    /// Scan of a token, to be stamped by the client.
    Scan(String),
    LinkUp,
    LinkDown,
    Probe,
    Sync,
    Status { json: bool },
    Queue { limit: usize },
    Clear,
    Help,
    Quit,
}

/// Error parsing a console line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("invalid argument '{0}'")]
    InvalidArgument(String),

    #[error("invalid scan event: {0}")]
    InvalidEvent(String),
}

impl Command {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if line.starts_with('{') {
            return ScanEvent::from_json(line)
                .map(|event| Some(Command::Event(event)))
                .map_err(|e| ParseError::InvalidEvent(e.to_string()));
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["scan"] => {
                return Err(ParseError::MissingArgument {
                    command: "scan",
                    what: "a token id",
                })
            }
            ["scan", token] => Command::Scan((*token).to_string()),
            ["link", "up"] => Command::LinkUp,
            ["link", "down"] => Command::LinkDown,
            ["link"] | ["link", _] => {
                return Err(ParseError::MissingArgument {
                    command: "link",
                    what: "'up' or 'down'",
                })
            }
            ["probe"] => Command::Probe,
            ["sync"] => Command::Sync,
            ["status"] => Command::Status { json: false },
            ["status", "json"] => Command::Status { json: true },
            ["queue"] => Command::Queue {
                limit: DEFAULT_QUEUE_LIMIT,
            },
            ["queue", n] => match n.parse::<usize>() {
                Ok(limit) if limit > 0 => Command::Queue { limit },
                _ => return Err(ParseError::InvalidArgument((*n).to_string())),
            },
            ["clear"] => Command::Clear,
            ["help"] | ["?"] => Command::Help,
            ["quit"] | ["exit"] => Command::Quit,
            _ => return Err(ParseError::Unknown(line.to_string())),
        };

        Ok(Some(command))
    }
}

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Print the reply and read the next line.
    Continue(String),
    Quit,
}

/// Run a command against the client.
pub async fn execute<T: Transport + 'static>(
    client: &OrchestratorClient<T>,
    command: Command,
) -> Flow {
    let reply = match command {
        Command::Event(event) => record(client, &event).await,
        Command::Scan(token) => match client.scan_event(&token) {
            Ok(event) => record(client, &event).await,
            Err(e) => format!("error: {e}"),
        },
        Command::LinkUp => {
            let probe = client.link_up().await;
            format!("{} ({})", client.connection_state(), describe_probe(&probe))
        }
        Command::LinkDown => {
            client.link_down();
            client.connection_state().to_string()
        }
        Command::Probe => {
            let probe = client.probe().await;
            format!("{} ({})", client.connection_state(), describe_probe(&probe))
        }
        Command::Sync => {
            client.sync_now();
            "sync requested".to_string()
        }
        Command::Status { json: false } => client.diagnostics().to_string(),
        Command::Status { json: true } => serde_json::to_string_pretty(&client.diagnostics())
            .unwrap_or_else(|e| format!("error: {e}")),
        Command::Queue { limit } => list_queue(client, limit),
        Command::Clear => match client.clear_queue() {
            Ok(n) => format!("cleared {n} queued scans"),
            Err(e) => format!("error: {e}"),
        },
        Command::Help => HELP.to_string(),
        Command::Quit => return Flow::Quit,
    };
    Flow::Continue(reply)
}

async fn record<T: Transport + 'static>(client: &OrchestratorClient<T>, event: &ScanEvent) -> String {
    match client.record_scan(event).await {
        RecordOutcome::Delivered => format!("{}: delivered", event.token_id()),
        RecordOutcome::Queued { evicted: false } => {
            format!("{}: queued ({} pending)", event.token_id(), client.queue_size())
        }
        RecordOutcome::Queued { evicted: true } => format!(
            "{}: queued, oldest scan evicted ({} pending)",
            event.token_id(),
            client.queue_size()
        ),
        RecordOutcome::Dropped => format!("{}: DROPPED (send and queue both failed)", event.token_id()),
    }
}

fn list_queue<T: Transport + 'static>(client: &OrchestratorClient<T>, limit: usize) -> String {
    let pending = match client.pending(limit) {
        Ok(pending) => pending,
        Err(e) => return format!("error: {e}"),
    };
    if pending.is_empty() {
        return "queue empty".to_string();
    }

    let mut lines = vec![format!(
        "{} queued, showing {}:",
        client.queue_size(),
        pending.len()
    )];
    for (i, event) in pending.iter().enumerate() {
        let json = event.to_json().unwrap_or_default();
        lines.push(format!("{:>3}. {json}", i + 1));
    }
    lines.join("\n")
}

fn describe_probe(probe: &ProbeOutcome) -> String {
    match probe {
        ProbeOutcome::NoNetwork => "no network".to_string(),
        ProbeOutcome::Healthy(status) => format!(
            "healthy, version {}",
            status.version.as_deref().unwrap_or("unknown")
        ),
        ProbeOutcome::Unhealthy { code } => format!("unhealthy, status {code}"),
        ProbeOutcome::Unreachable(e) => format!("unreachable: {e}"),
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
