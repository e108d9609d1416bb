//! Connectivity supervisor against a mock network driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pinsync::config::BackoffConfig;
use pinsync::fsm::{ConnectionState, ConnectivitySupervisor, LinkEvent, LinkEventQueue, LinkStatus};

use crate::mock_hw::{MockDelay, MockNetwork};

const IMMEDIATE: BackoffConfig = BackoffConfig {
    initial_ms: 0,
    max_ms: 60_000,
};

fn supervisor(
    net: MockNetwork,
    backoff: BackoffConfig,
) -> (Arc<LinkStatus>, ConnectivitySupervisor<MockNetwork, MockDelay>) {
    let status = Arc::new(LinkStatus::new());
    let s = ConnectivitySupervisor::new(net, MockDelay::default(), Arc::clone(&status), backoff);
    (status, s)
}

fn feed(s: &mut ConnectivitySupervisor<MockNetwork, MockDelay>, events: &[LinkEvent]) -> ConnectionState {
    let mut last = s.state();
    for &ev in events {
        last = s.handle(ev);
    }
    last
}

#[test]
fn survives_repeated_network_loss() {
    let (status, mut s) = supervisor(MockNetwork::default(), IMMEDIATE);
    feed(&mut s, &[LinkEvent::Start, LinkEvent::StationStarted]);

    for cycle in 1..=20u32 {
        let state = feed(
            &mut s,
            &[LinkEvent::Connected, LinkEvent::GotAddress, LinkEvent::Authenticated],
        );
        assert_eq!(state, ConnectionState::Authenticated, "cycle {cycle}");
        assert!(status.is_authenticated());

        assert_eq!(s.handle(LinkEvent::Disconnected), ConnectionState::Connecting);
        assert!(!status.is_authenticated());
        assert_eq!(s.reconnects(), cycle);
    }
    // One initial connect plus one per disconnect.
    assert_eq!(s.network().connects, 21);
    assert_eq!(s.network().link_local, 20);
}

#[test]
fn refused_connects_keep_retrying() {
    let net = MockNetwork {
        refuse: true,
        ..MockNetwork::default()
    };
    let (_status, mut s) = supervisor(net, IMMEDIATE);
    feed(&mut s, &[LinkEvent::Start, LinkEvent::StationStarted]);
    assert_eq!(s.state(), ConnectionState::Connecting);

    // The driver reports each failed association as a disconnect.
    for _ in 0..5 {
        assert_eq!(s.handle(LinkEvent::Disconnected), ConnectionState::Connecting);
    }
    assert_eq!(s.network().connects, 6);
}

#[test]
fn manual_mode_connects_only_on_request() {
    let net = MockNetwork {
        auto_connect: false,
        ..MockNetwork::default()
    };
    let (_status, mut s) = supervisor(net, IMMEDIATE);
    feed(&mut s, &[LinkEvent::Start, LinkEvent::StationStarted]);
    assert_eq!(s.network().connects, 0);

    s.handle(LinkEvent::ConnectRequested);
    assert_eq!(s.network().connects, 1);
    assert_eq!(
        feed(&mut s, &[LinkEvent::Connected, LinkEvent::Authenticated]),
        ConnectionState::Authenticated
    );
}

#[test]
fn session_drop_keeps_wifi_up() {
    let (status, mut s) = supervisor(MockNetwork::default(), IMMEDIATE);
    feed(
        &mut s,
        &[LinkEvent::Start, LinkEvent::StationStarted, LinkEvent::Connected, LinkEvent::Authenticated],
    );
    assert_eq!(s.handle(LinkEvent::SessionClosed), ConnectionState::Connected);
    assert_eq!(status.get(), ConnectionState::Connected);
    assert_eq!(s.network().connects, 1);
    assert_eq!(s.handle(LinkEvent::Authenticated), ConnectionState::Authenticated);
}

#[test]
fn stray_events_before_start_are_ignored() {
    let (status, mut s) = supervisor(MockNetwork::default(), IMMEDIATE);
    feed(
        &mut s,
        &[LinkEvent::Connected, LinkEvent::Disconnected, LinkEvent::Authenticated, LinkEvent::GotAddress],
    );
    assert_eq!(s.state(), ConnectionState::Idle);
    assert_eq!(status.get(), ConnectionState::Idle);
    assert_eq!(s.network().connects, 0);
}

#[test]
fn queued_events_drive_supervisor_in_order() {
    let q = LinkEventQueue::new();
    let (_status, mut s) = supervisor(MockNetwork::default(), IMMEDIATE);
    for ev in [LinkEvent::Start, LinkEvent::StationStarted, LinkEvent::Connected] {
        q.post(ev);
    }
    while let Some(ev) = q.try_next() {
        s.handle(ev);
    }
    assert_eq!(s.state(), ConnectionState::Connected);
}

#[test]
fn backoff_caps_and_resets() {
    let backoff = BackoffConfig {
        initial_ms: 1_000,
        max_ms: 4_000,
    };
    let (_status, mut s) = supervisor(MockNetwork::default(), backoff);
    feed(&mut s, &[LinkEvent::Start, LinkEvent::StationStarted]);

    let mut waits = Vec::new();
    let mut disconnect_and_wait = |s: &mut ConnectivitySupervisor<MockNetwork, MockDelay>| {
        s.handle(LinkEvent::Disconnected);
        waits.extend(s.reconnect_in_ms());
        s.advance(u32::MAX)
    };
    for _ in 0..5 {
        assert_eq!(disconnect_and_wait(&mut s), ConnectionState::Connecting);
    }
    feed(&mut s, &[LinkEvent::Connected, LinkEvent::Authenticated]);
    assert_eq!(disconnect_and_wait(&mut s), ConnectionState::Connecting);

    assert_eq!(s.reconnects(), 6);
    assert_eq!(s.network().connects, 7);
    assert_eq!(waits, [1_000, 2_000, 4_000, 4_000, 4_000, 1_000]);
}

#[test]
fn flood_during_backoff_never_loses_a_disconnect() {
    let backoff = BackoffConfig {
        initial_ms: 60_000,
        max_ms: 60_000,
    };
    let q: &'static LinkEventQueue = Box::leak(Box::new(LinkEventQueue::new()));
    let (status, mut s) = supervisor(MockNetwork::default(), backoff);
    feed(&mut s, &[LinkEvent::Start, LinkEvent::StationStarted]);
    s.handle(LinkEvent::Disconnected);
    assert!(s.reconnect_in_ms().is_some());

    // The driver reassociates on its own, chatters, then drops again,
    // all while the supervisor is still counting the backoff down.
    let driver = std::thread::spawn(move || {
        q.post(LinkEvent::Connected);
        for _ in 0..40 {
            q.post(LinkEvent::GotAddress);
        }
        q.post(LinkEvent::Disconnected);
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        assert!(Instant::now() < deadline, "supervisor stalled");
        match q.try_next() {
            Some(ev) => {
                s.handle(ev);
            }
            None if driver.is_finished() => break,
            None => std::thread::yield_now(),
        }
    }
    driver.join().unwrap();
    while let Some(ev) = q.try_next() {
        s.handle(ev);
    }

    assert_eq!(s.state(), ConnectionState::Disconnected);
    assert_eq!(status.get(), ConnectionState::Disconnected);
    assert_eq!(s.reconnects(), 2);
    assert_eq!(s.network().link_local, 1);
    // No wall-clock sleep happened while events were pending.
    assert!(s.delay().waits_ms.is_empty());
    assert_eq!(s.advance(u32::MAX), ConnectionState::Connecting);
}
