//! Connectivity supervisor task.
//!
//! Owns the [`ConnectionState`] and the [`NetworkPort`].  Each event goes
//! through [`transition`]; the resulting action is applied immediately.
//! A disconnect reconnects at once unless a backoff is configured, in
//! which case the delay doubles per consecutive disconnect (capped) and
//! resets once a session authenticates.
//!
//! A backoff wait is a countdown, not a sleep: [`ConnectivitySupervisor::poll`]
//! keeps draining the event queue in [`RECONNECT_POLL_MS`] slices while it
//! runs, so events posted during the wait are handled as they arrive.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::NetworkPort;
use crate::config::BackoffConfig;

use super::{transition, Action, ConnectionState, LinkEvent, LinkEventQueue, LinkStatus};

/// Granularity of a backoff countdown.
pub const RECONNECT_POLL_MS: u32 = 50;

/// Reconnect delay sequence.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    config: BackoffConfig,
    next_ms: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            next_ms: config.initial_ms,
        }
    }

    /// Delay before the next reconnect attempt, then advance.
    pub fn next_delay_ms(&mut self) -> u32 {
        let delay = self.next_ms;
        self.next_ms = delay.saturating_mul(2).min(self.config.max_ms);
        delay
    }

    pub fn reset(&mut self) {
        self.next_ms = self.config.initial_ms;
    }
}

pub struct ConnectivitySupervisor<N: NetworkPort, D: DelayNs> {
    net: N,
    delay: D,
    state: ConnectionState,
    status: Arc<LinkStatus>,
    backoff: Backoff,
    reconnects: u32,
    /// Time left before `ReconnectDue`, while a backoff wait runs.
    reconnect_in_ms: Option<u32>,
}

impl<N: NetworkPort, D: DelayNs> ConnectivitySupervisor<N, D> {
    pub fn new(net: N, delay: D, status: Arc<LinkStatus>, backoff: BackoffConfig) -> Self {
        status.publish(ConnectionState::Idle);
        Self {
            net,
            delay,
            state: ConnectionState::Idle,
            status,
            backoff: Backoff::new(backoff),
            reconnects: 0,
            reconnect_in_ms: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts since boot.
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    pub fn network(&self) -> &N {
        &self.net
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Time left on a running backoff wait.
    pub fn reconnect_in_ms(&self) -> Option<u32> {
        self.reconnect_in_ms
    }

    /// Feed one event.  Returns the state afterwards.
    pub fn handle(&mut self, event: LinkEvent) -> ConnectionState {
        let Some(step) = transition(self.state, event, self.net.auto_connect()) else {
            debug!("link: {:?} ignored in {:?}", event, self.state);
            return self.state;
        };

        if step.next != self.state {
            info!("link: {:?} -> {:?} ({:?})", self.state, step.next, event);
        }
        self.state = step.next;
        self.status.publish(step.next);
        if step.next != ConnectionState::Disconnected {
            self.reconnect_in_ms = None;
        }

        if step.next == ConnectionState::Authenticated {
            self.backoff.reset();
        }
        if let Some(action) = step.action {
            self.apply(action);
        }
        self.state
    }

    /// Count a running backoff wait down by `elapsed_ms`; fires
    /// `ReconnectDue` when it runs out.
    pub fn advance(&mut self, elapsed_ms: u32) -> ConnectionState {
        if let Some(left) = self.reconnect_in_ms {
            let left = left.saturating_sub(elapsed_ms);
            if left == 0 {
                self.reconnect_in_ms = None;
                return self.handle(LinkEvent::ReconnectDue);
            }
            self.reconnect_in_ms = Some(left);
        }
        self.state
    }

    /// One step of the task loop.  Blocks for the next event, or, during
    /// a backoff wait, handles whatever is queued and otherwise sleeps
    /// one slice of the countdown.
    pub fn poll(&mut self, events: &LinkEventQueue) -> ConnectionState {
        if self.reconnect_in_ms.is_none() {
            let event = events.next();
            return self.handle(event);
        }
        match events.try_next() {
            Some(event) => self.handle(event),
            None => {
                let slice = self.reconnect_in_ms.map_or(0, |left| left.min(RECONNECT_POLL_MS));
                self.delay.delay_ms(slice);
                self.advance(slice)
            }
        }
    }

    /// Task body: process events forever.
    pub fn run(mut self, events: &LinkEventQueue) -> ! {
        info!("link: supervisor running");
        loop {
            self.poll(events);
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Connect => {
                // Failures surface later as a Disconnected event.
                if let Err(e) = self.net.connect() {
                    warn!("link: connect request failed: {}", e);
                }
            }
            Action::EnableLinkLocal => {
                if let Err(e) = self.net.enable_link_local() {
                    warn!("link: {}", e);
                }
            }
            Action::ScheduleReconnect => {
                self.reconnects = self.reconnects.wrapping_add(1);
                let wait_ms = self.backoff.next_delay_ms();
                if wait_ms == 0 {
                    self.handle(LinkEvent::ReconnectDue);
                } else {
                    info!("link: reconnect #{} in {} ms", self.reconnects, wait_ms);
                    self.reconnect_in_ms = Some(wait_ms);
                }
            }
        }
    }
}
