// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::thread;

use super::*;
use yare::parameterized;

use ConnectionState::{Disconnected, NetworkConnected, ServiceConnected};

#[test]
fn starts_disconnected() {
    let machine = ConnectionStateMachine::new();
    assert_eq!(machine.get(), Disconnected);
    assert!(!machine.is_service_reachable());
    assert!(!machine.has_network());
}

#[parameterized(
    link_up_from_disconnected = { Disconnected, LinkEvent::LinkUp, NetworkConnected },
    link_up_keeps_network = { NetworkConnected, LinkEvent::LinkUp, NetworkConnected },
    link_up_keeps_service = { ServiceConnected, LinkEvent::LinkUp, ServiceConnected },
    link_down_from_network = { NetworkConnected, LinkEvent::LinkDown, Disconnected },
    link_down_from_service = { ServiceConnected, LinkEvent::LinkDown, Disconnected },
    probe_ok_promotes = { NetworkConnected, LinkEvent::ProbeSucceeded, ServiceConnected },
    probe_ok_keeps_service = { ServiceConnected, LinkEvent::ProbeSucceeded, ServiceConnected },
    probe_ok_ignored_offline = { Disconnected, LinkEvent::ProbeSucceeded, Disconnected },
    probe_fail_demotes = { ServiceConnected, LinkEvent::ProbeFailed, NetworkConnected },
    probe_fail_keeps_network = { NetworkConnected, LinkEvent::ProbeFailed, NetworkConnected },
    probe_fail_ignored_offline = { Disconnected, LinkEvent::ProbeFailed, Disconnected },
)]
fn transitions(from: ConnectionState, event: LinkEvent, to: ConnectionState) {
    assert_eq!(next_state(from, event), to);
}

#[test]
fn service_connected_never_follows_disconnected() {
    let states = [Disconnected, NetworkConnected, ServiceConnected];
    let events = [
        LinkEvent::LinkUp,
        LinkEvent::LinkDown,
        LinkEvent::ProbeSucceeded,
        LinkEvent::ProbeFailed,
    ];

    for from in states {
        for event in events {
            let to = next_state(from, event);
            if to == ServiceConnected {
                assert_ne!(from, Disconnected, "{event:?} skipped NETWORK_CONNECTED");
            }
        }
    }
}

#[test]
fn apply_reports_transition() {
    let machine = ConnectionStateMachine::new();

    let t = machine.apply(LinkEvent::LinkUp);
    assert_eq!(
        t,
        Transition {
            from: Disconnected,
            to: NetworkConnected
        }
    );
    assert!(t.changed());

    let t = machine.apply(LinkEvent::LinkUp);
    assert!(!t.changed());

    machine.apply(LinkEvent::ProbeSucceeded);
    assert!(machine.is_service_reachable());
    assert!(machine.has_network());
}

#[test]
fn set_rejects_skipping_network_connected() {
    let machine = ConnectionStateMachine::new();

    let err = machine.set(ServiceConnected).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: Disconnected,
            to: ServiceConnected
        }
    ));
    assert_eq!(machine.get(), Disconnected);
}

#[test]
fn set_allows_valid_moves() {
    let machine = ConnectionStateMachine::new();
    machine.set(NetworkConnected).unwrap();
    machine.set(ServiceConnected).unwrap();
    assert!(machine.is_service_reachable());

    let t = machine.set(Disconnected).unwrap();
    assert_eq!(t.from, ServiceConnected);
    assert_eq!(machine.get(), Disconnected);
}

#[test]
fn display_names() {
    assert_eq!(Disconnected.to_string(), "DISCONNECTED");
    assert_eq!(NetworkConnected.to_string(), "NETWORK_CONNECTED");
    assert_eq!(ServiceConnected.to_string(), "SERVICE_CONNECTED");
    assert_eq!(
        serde_json::to_string(&NetworkConnected).unwrap(),
        "\"NETWORK_CONNECTED\""
    );
}

#[test]
fn concurrent_events_never_skip_network_connected() {
    let machine = Arc::new(ConnectionStateMachine::new());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let machine = Arc::clone(&machine);
            thread::spawn(move || {
                for n in 0..500 {
                    let event = match (i + n) % 4 {
                        0 => LinkEvent::LinkUp,
                        1 => LinkEvent::ProbeSucceeded,
                        2 => LinkEvent::ProbeFailed,
                        _ => LinkEvent::LinkDown,
                    };
                    let t = machine.apply(event);
                    if t.to == ServiceConnected {
                        assert_ne!(t.from, Disconnected);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
