// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability of the orchestrator as seen from this device.
//!
//! ```text
//!                 LinkUp                 ProbeSucceeded
//!  DISCONNECTED ─────────► NETWORK_CONNECTED ─────────► SERVICE_CONNECTED
//!       ▲                        ▲   ◄──────────────────────┘
//!       │        LinkDown        │       ProbeFailed
//!       └────────────────────────┴─────────────────────────────(any)
//! ```
//!
//! `SERVICE_CONNECTED` is never entered directly from `DISCONNECTED`.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How reachable the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No network link.
    #[default]
    Disconnected,
    /// Network link up, orchestrator unknown or unhealthy.
    NetworkConnected,
    /// Network link up and the last health probe succeeded.
    ServiceConnected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::NetworkConnected => "NETWORK_CONNECTED",
            ConnectionState::ServiceConnected => "SERVICE_CONNECTED",
        }
    }

    /// Returns true if a network link is present.
    pub fn has_network(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Network link established.
    LinkUp,
    /// Network link lost.
    LinkDown,
    /// Health probe answered 200.
    ProbeSucceeded,
    /// Health probe failed or timed out, or uploads kept failing.
    ProbeFailed,
}

/// Result of applying a change to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl Transition {
    /// Returns true if the state actually changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Computes the next state for an event.
///
/// A probe result seen without a network link is ignored, which is what
/// keeps `DISCONNECTED -> SERVICE_CONNECTED` impossible.
pub fn next_state(current: ConnectionState, event: LinkEvent) -> ConnectionState {
    use ConnectionState::*;

    match (current, event) {
        (_, LinkEvent::LinkDown) => Disconnected,
        (Disconnected, LinkEvent::LinkUp) => NetworkConnected,
        (state, LinkEvent::LinkUp) => state,
        (Disconnected, LinkEvent::ProbeSucceeded | LinkEvent::ProbeFailed) => Disconnected,
        (_, LinkEvent::ProbeSucceeded) => ServiceConnected,
        (_, LinkEvent::ProbeFailed) => NetworkConnected,
    }
}

/// Thread-safe holder for the process-wide [`ConnectionState`].
///
/// Starts in `DISCONNECTED`. Every read and write goes through one mutex so
/// that the network subsystem, the sync worker and the capture path always
/// observe a consistent value.
#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    state: Mutex<ConnectionState>,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    pub fn get(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the state directly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] for `DISCONNECTED -> SERVICE_CONNECTED`;
    /// the state is left unchanged.
    pub fn set(&self, to: ConnectionState) -> Result<Transition> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        if from == ConnectionState::Disconnected && to == ConnectionState::ServiceConnected {
            return Err(Error::InvalidTransition { from, to });
        }
        *state = to;
        Ok(Transition { from, to })
    }

    /// Apply a link or probe event.
    pub fn apply(&self, event: LinkEvent) -> Transition {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        let to = next_state(from, event);
        *state = to;
        drop(state);

        if from != to {
            tracing::info!(%from, %to, ?event, "connection state changed");
        }
        Transition { from, to }
    }

    /// Returns true if the orchestrator is currently reachable.
    pub fn is_service_reachable(&self) -> bool {
        self.get() == ConnectionState::ServiceConnected
    }

    /// Returns true if a network link is present.
    pub fn has_network(&self) -> bool {
        self.get().has_network()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
