// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Health probe that moves the state between network and service reachability.

use std::time::Duration;

use scan_core::{ConnectionStateMachine, HealthStatus, LinkEvent};

use super::transport::{Endpoints, Transport, TransportError};

/// Result of one `GET /health`.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// No network link, nothing was sent.
    NoNetwork,
    /// 200. The body is informational.
    Healthy(HealthStatus),
    /// Any status other than 200.
    Unhealthy { code: u16 },
    /// No response.
    Unreachable(TransportError),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy(_))
    }
}

/// Probe the orchestrator and apply the result to `state`.
///
/// Skipped while disconnected. Only an exact 200 promotes the state; every
/// other result demotes it to `NETWORK_CONNECTED`.
pub async fn probe<T: Transport + ?Sized>(
    transport: &T,
    endpoints: &Endpoints,
    timeout: Duration,
    state: &ConnectionStateMachine,
) -> ProbeOutcome {
    if !state.has_network() {
        return ProbeOutcome::NoNetwork;
    }

    let outcome = match transport.get(endpoints.health(), timeout).await {
        Ok(resp) if resp.code == 200 => ProbeOutcome::Healthy(HealthStatus::parse_lenient(&resp.body)),
        Ok(resp) => ProbeOutcome::Unhealthy { code: resp.code },
        Err(e) => ProbeOutcome::Unreachable(e),
    };

    match &outcome {
        ProbeOutcome::Healthy(status) => {
            tracing::debug!(
                status = status.status.as_deref().unwrap_or("-"),
                version = status.version.as_deref().unwrap_or("-"),
                uptime = status.uptime,
                "orchestrator healthy"
            );
            state.apply(LinkEvent::ProbeSucceeded);
        }
        ProbeOutcome::Unhealthy { code } => {
            tracing::warn!(code, "health probe returned non-200");
            state.apply(LinkEvent::ProbeFailed);
        }
        ProbeOutcome::Unreachable(e) => {
            tracing::warn!(error = %e, "health probe failed");
            state.apply(LinkEvent::ProbeFailed);
        }
        ProbeOutcome::NoNetwork => {}
    }

    outcome
}
