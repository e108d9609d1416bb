//! Connectivity supervisor state machine.
//!
//! ```text
//!          Start        StationStarted           Connected
//!  Idle ─────────▶ Starting ─────────▶ Connecting ─────────▶ Connected
//!                                       ▲    ▲ ConnectRequested   │  ▲
//!                          ReconnectDue │    └────────┘           │  │ SessionClosed
//!                                       │                 Authen- ▼  │
//!                               Disconnected ◀──────────── Authenticated
//!                                       ▲      Disconnected
//!                                       └─── (also from Connecting / Connected)
//! ```
//!
//! [`transition`] is the only place that decides the next state; the
//! [`ConnectivitySupervisor`] applies the returned [`Action`] through the
//! [`NetworkPort`].  Pairs not listed in `transition` are ignored, so the
//! machine cannot be driven into a state the table does not name.
//!
//! There is no terminal state.  Every network error is transient: a
//! disconnect always leads back to `Connecting`.

pub mod supervisor;

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};

pub use supervisor::{Backoff, ConnectivitySupervisor};

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

/// Remote-session lifecycle, owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Starting = 1,
    Connecting = 2,
    Connected = 3,
    Authenticated = 4,
    Disconnected = 5,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Connecting,
            3 => Self::Connected,
            4 => Self::Authenticated,
            5 => Self::Disconnected,
            _ => Self::Idle,
        }
    }
}

/// Inputs to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Supervisor start (posted once by `main`).
    Start,
    /// Network interface reports the station started.
    StationStarted,
    /// Explicit connect trigger when auto-connect is off.
    ConnectRequested,
    /// Associated with the access point.
    Connected,
    /// DHCP lease obtained.
    GotAddress,
    /// Protocol client completed its handshake.
    Authenticated,
    /// Protocol client lost its session while the network stayed up.
    SessionClosed,
    /// Network-level disconnect, for any reason.
    Disconnected,
    /// Reconnect delay elapsed (supervisor-internal).
    ReconnectDue,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ask the network driver to associate.
    Connect,
    /// Secondary bring-up after association.
    EnableLinkLocal,
    /// Wait out the reconnect delay, then feed `ReconnectDue`.
    ScheduleReconnect,
}

/// Result of a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: ConnectionState,
    pub action: Option<Action>,
}

impl Step {
    const fn to(next: ConnectionState) -> Self {
        Self { next, action: None }
    }

    const fn with(next: ConnectionState, action: Action) -> Self {
        Self {
            next,
            action: Some(action),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition function
// ---------------------------------------------------------------------------

/// The complete transition table.  `None` means the event is ignored in
/// `state`.
pub fn transition(state: ConnectionState, event: LinkEvent, auto_connect: bool) -> Option<Step> {
    use ConnectionState as S;
    use LinkEvent as E;

    let step = match (state, event) {
        (S::Idle, E::Start) => Step::to(S::Starting),

        (S::Starting, E::StationStarted) if auto_connect => Step::with(S::Connecting, Action::Connect),
        (S::Starting, E::StationStarted) => Step::to(S::Connecting),

        (S::Connecting, E::ConnectRequested) => Step::with(S::Connecting, Action::Connect),

        (S::Connecting | S::Disconnected, E::Connected) => {
            Step::with(S::Connected, Action::EnableLinkLocal)
        }

        (S::Connected, E::GotAddress) => Step::to(S::Connected),
        (S::Authenticated, E::GotAddress) => Step::to(S::Authenticated),

        (S::Connected, E::Authenticated) => Step::to(S::Authenticated),
        (S::Authenticated, E::SessionClosed) => Step::to(S::Connected),

        (S::Connecting | S::Connected | S::Authenticated, E::Disconnected) => {
            Step::with(S::Disconnected, Action::ScheduleReconnect)
        }

        (S::Disconnected, E::ReconnectDue) => Step::with(S::Connecting, Action::Connect),

        _ => return None,
    };
    Some(step)
}

// ---------------------------------------------------------------------------
// Published state
// ---------------------------------------------------------------------------

/// Read-only mirror of the supervisor's state for other tasks.
/// Only the supervisor should publish to it.
#[derive(Debug)]
pub struct LinkStatus(AtomicU8);

impl Default for LinkStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStatus {
    pub const fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Idle as u8))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_authenticated(&self) -> bool {
        self.get() == ConnectionState::Authenticated
    }

    pub fn publish(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

/// Pending supervisor inputs.
pub const LINK_QUEUE_CAP: usize = 8;

/// Queue feeding the supervisor task.  Producers are the WiFi event
/// callback, the remote-session task and `main`, all in task context.
/// Nothing posted through [`post`](Self::post) is ever dropped.
pub struct LinkEventQueue {
    channel: Channel<CriticalSectionRawMutex, LinkEvent, LINK_QUEUE_CAP>,
}

impl Default for LinkEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkEventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Post, waiting for room if the queue is full.  Task context only;
    /// the supervisor itself must use [`try_post`](Self::try_post).
    pub fn post(&self, event: LinkEvent) {
        if self.channel.try_send(event).is_ok() {
            return;
        }
        debug!("link: event queue full, waiting to post {:?}", event);
        futures_lite::future::block_on(self.channel.send(event));
    }

    /// Post without blocking.  A full queue drops the event.
    pub fn try_post(&self, event: LinkEvent) -> bool {
        if self.channel.try_send(event).is_err() {
            warn!("link: event queue full, dropping {:?}", event);
            return false;
        }
        true
    }

    /// Block until the next event.
    pub fn next(&self) -> LinkEvent {
        futures_lite::future::block_on(self.channel.receive())
    }

    pub fn try_next(&self) -> Option<LinkEvent> {
        self.channel.try_receive().ok()
    }
}
