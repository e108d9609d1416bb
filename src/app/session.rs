//! Remote-session task.
//!
//! The protocol client pushes [`ClientEvent`]s into an [`InboundQueue`]
//! from its own context; this task drains the queue, runs commands
//! through the dispatcher, and forwards session changes to the
//! connectivity supervisor.
//!
//! Commands ride a bounded channel and are dropped (and counted) when it
//! is full.  Session state rides a [`Signal`] holding only the latest
//! value: it is never dropped, and is taken ahead of queued commands.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{info, warn};

use crate::fsm::{LinkEvent, LinkEventQueue};

use super::commands::{ClientEvent, RemoteCommand, SessionState};
use super::dispatcher::CommandDispatcher;
use super::ports::{ClientEventSink, GpioPort, ProtocolClient};
use super::sync::StateSynchronizer;

/// Pending inbound commands.
pub const INBOUND_QUEUE_CAP: usize = 8;

/// Client → session-task handoff.
pub struct InboundQueue {
    commands: Channel<CriticalSectionRawMutex, RemoteCommand, INBOUND_QUEUE_CAP>,
    session: Signal<CriticalSectionRawMutex, SessionState>,
    dropped: AtomicU32,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            session: Signal::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Block until the next event.  A pending session change wins over
    /// queued commands.
    pub fn next(&self) -> ClientEvent {
        if let Some(event) = self.try_next() {
            return event;
        }
        future::block_on(future::or(
            async { ClientEvent::Session(self.session.wait().await) },
            async { ClientEvent::Command(self.commands.receive().await) },
        ))
    }

    pub fn try_next(&self) -> Option<ClientEvent> {
        if let Some(state) = self.session.try_take() {
            return Some(ClientEvent::Session(state));
        }
        self.commands.try_receive().ok().map(ClientEvent::Command)
    }

    /// Commands dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ClientEventSink for InboundQueue {
    fn deliver(&self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Session(state) => {
                self.session.signal(state);
                true
            }
            ClientEvent::Command(cmd) => {
                if self.commands.try_send(cmd).is_ok() {
                    return true;
                }
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

pub struct RemoteSession<'q, C: ProtocolClient, G: GpioPort> {
    dispatcher: CommandDispatcher<C>,
    sync: StateSynchronizer<G>,
    link_events: &'q LinkEventQueue,
}

impl<'q, C: ProtocolClient, G: GpioPort> RemoteSession<'q, C, G> {
    pub fn new(
        dispatcher: CommandDispatcher<C>,
        sync: StateSynchronizer<G>,
        link_events: &'q LinkEventQueue,
    ) -> Self {
        Self {
            dispatcher,
            sync,
            link_events,
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<C> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher<C> {
        &mut self.dispatcher
    }

    pub fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Command(cmd) => {
                self.dispatcher.dispatch(&cmd, &self.sync);
            }
            ClientEvent::Session(SessionState::Authenticated) => {
                info!("session: authenticated");
                self.link_events.post(LinkEvent::Authenticated);
            }
            ClientEvent::Session(SessionState::Closed) => {
                warn!("session: closed");
                self.link_events.post(LinkEvent::SessionClosed);
            }
        }
    }

    /// Task body: drain `inbound` forever.
    pub fn run(mut self, inbound: &InboundQueue) -> ! {
        info!("session: task running (V{})", self.sync.virtual_pin());
        let mut reported_drops = 0;
        loop {
            let event = inbound.next();
            let dropped = inbound.dropped();
            if dropped != reported_drops {
                warn!("session: {} inbound commands dropped", dropped - reported_drops);
                reported_drops = dropped;
            }
            self.handle(event);
        }
    }
}
