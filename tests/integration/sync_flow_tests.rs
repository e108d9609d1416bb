//! End-to-end flows: button edge → store → peer, and peer → store → pin.

use std::sync::Arc;

use pinsync::adapters::remote::NullClient;
use pinsync::app::commands::{ClientEvent, MessageKind, RemoteCommand, SessionState};
use pinsync::app::dispatcher::{CommandDispatcher, HARDWARE_CHANNEL};
use pinsync::app::ports::{ClientEventSink, ProtocolClient};
use pinsync::app::session::{InboundQueue, RemoteSession, INBOUND_QUEUE_CAP};
use pinsync::app::state::{HardwareState, SharedHardware};
use pinsync::app::sync::StateSynchronizer;
use pinsync::config::{BackoffConfig, SyncConfig};
use pinsync::drivers::edge_detector::{EdgeBinding, EdgeDetector, EdgeKind, EdgeOutcome};
use pinsync::events::{EdgeProducer, EdgeQueue};
use pinsync::fsm::{ConnectionState, ConnectivitySupervisor, LinkEvent, LinkEventQueue, LinkStatus};
use pinsync::pins::PinId;

use crate::mock_hw::{MockClient, MockDelay, MockGpio, MockNetwork};

const BUTTON: PinId = 36;
const LED: PinId = 22;
const VPIN: PinId = 22;

struct Device {
    gpio: MockGpio,
    hw: Arc<SharedHardware<MockGpio>>,
    edges: EdgeProducer<'static>,
    link_events: &'static LinkEventQueue,
    detector: EdgeDetector<'static, MockGpio, MockGpio, MockDelay>,
    supervisor: ConnectivitySupervisor<MockNetwork, MockDelay>,
    session: RemoteSession<'static, MockClient, MockGpio>,
}

impl Device {
    fn new() -> Self {
        let gpio = MockGpio::new();
        let hw = Arc::new(SharedHardware::new(
            HardwareState::new(gpio.clone(), &[LED]).unwrap(),
        ));
        let (edges, edge_rx) = Box::leak(Box::new(EdgeQueue::new())).split();
        let link_events: &'static LinkEventQueue = Box::leak(Box::new(LinkEventQueue::new()));
        let link = Arc::new(LinkStatus::new());

        let detector = EdgeDetector::new(edge_rx, Arc::clone(&hw), gpio.clone(), MockDelay::default(), 100)
            .bind(EdgeBinding {
                input: BUTTON,
                target: LED,
                edge: EdgeKind::Falling,
            });
        let supervisor = ConnectivitySupervisor::new(
            MockNetwork::default(),
            MockDelay::default(),
            Arc::clone(&link),
            BackoffConfig { initial_ms: 0, max_ms: 0 },
        );
        let session = RemoteSession::new(
            CommandDispatcher::standard(MockClient::default(), link),
            StateSynchronizer::new(Arc::clone(&hw), VPIN, LED),
            link_events,
        );

        Self {
            gpio,
            hw,
            edges,
            link_events,
            detector,
            supervisor,
            session,
        }
    }

    /// Feed every queued link event to the supervisor.
    fn pump_link(&mut self) {
        while let Some(ev) = self.link_events.try_next() {
            self.supervisor.handle(ev);
        }
    }

    fn bring_online(&mut self) {
        for ev in [LinkEvent::Start, LinkEvent::StationStarted, LinkEvent::Connected, LinkEvent::GotAddress] {
            self.link_events.post(ev);
        }
        self.pump_link();
        self.session.handle(ClientEvent::Session(SessionState::Authenticated));
        self.pump_link();
        assert_eq!(self.supervisor.state(), ConnectionState::Authenticated);
    }

    /// Button goes low and the ISR fires at `ts`.
    fn press(&mut self, ts: u32) {
        self.gpio.set_input(BUTTON, false);
        self.edges.on_raw_edge(BUTTON, false, ts);
    }

    fn remote(&mut self, name: &str, args: &[&str]) {
        let cmd = RemoteCommand::new(name, args).unwrap();
        self.session.handle(ClientEvent::Command(cmd));
    }

    fn sent(&self) -> &[(MessageKind, u16, Vec<u8>)] {
        &self.session.dispatcher().client().sent
    }
}

#[test]
fn button_press_reaches_peer_exactly_once() {
    let mut dev = Device::new();
    dev.bring_online();

    dev.press(1_000);
    assert_eq!(dev.detector.consume_and_debounce(), EdgeOutcome::Toggled(true));
    assert!(dev.gpio.level(LED));

    dev.remote("vr", &["22"]);
    dev.remote("vr", &["22"]);

    assert_eq!(dev.sent().len(), 1);
    let (kind, channel, body) = &dev.sent()[0];
    assert_eq!(*kind, MessageKind::Hardware);
    assert_eq!(*channel, HARDWARE_CHANNEL);
    assert_eq!(body.as_slice(), b"vw\x0022\x001");
}

#[test]
fn bouncing_contact_toggles_once() {
    let mut dev = Device::new();
    for ts in [0, 30, 60] {
        dev.press(ts);
    }
    let outcomes: Vec<_> = (0..3).map(|_| dev.detector.consume_and_debounce()).collect();
    assert_eq!(
        outcomes,
        [EdgeOutcome::Toggled(true), EdgeOutcome::Suppressed, EdgeOutcome::Suppressed]
    );
    assert_eq!(dev.gpio.writes(), [(LED, false), (LED, true)]);
}

#[test]
fn short_pulse_released_before_handling_is_ignored() {
    let mut dev = Device::new();
    dev.edges.on_raw_edge(BUTTON, false, 0);
    // Released before the consumer ran.
    dev.gpio.set_input(BUTTON, true);
    assert_eq!(dev.detector.consume_and_debounce(), EdgeOutcome::LevelMismatch);
    assert!(!dev.gpio.level(LED));
}

#[test]
fn remote_write_drives_only_owned_pin() {
    let mut dev = Device::new();
    dev.bring_online();

    dev.remote("vw", &["22", "1"]);
    assert!(dev.gpio.level(LED));
    assert_eq!(dev.hw.read(LED), Ok(true));

    dev.remote("vw", &["5", "0"]);
    dev.remote("vw", &["22"]);
    dev.remote("vw", &[]);
    assert_eq!(dev.hw.read(LED), Ok(true));
    assert!(dev.gpio.writes().iter().all(|(pin, _)| *pin == LED));
}

#[test]
fn read_request_without_session_is_held_back() {
    let mut dev = Device::new();
    dev.press(0);
    dev.detector.consume_and_debounce();

    dev.remote("vr", &["22"]);
    assert!(dev.sent().is_empty());
    assert_eq!(dev.hw.record(LED).map(|r| r.notified), Ok(false));

    dev.bring_online();
    dev.remote("vr", &["22"]);
    assert_eq!(dev.sent().len(), 1);
}

#[test]
fn session_loss_stops_sends_until_reauth() {
    let mut dev = Device::new();
    dev.bring_online();
    dev.session.handle(ClientEvent::Session(SessionState::Closed));
    dev.pump_link();
    assert_eq!(dev.supervisor.state(), ConnectionState::Connected);

    dev.remote("vw", &["22", "1"]);
    dev.remote("vr", &["22"]);
    assert!(dev.sent().is_empty());

    dev.session.handle(ClientEvent::Session(SessionState::Authenticated));
    dev.pump_link();
    dev.remote("vr", &["22"]);
    assert_eq!(dev.sent().len(), 1);
}

#[test]
fn failed_send_is_retried_on_next_read_request() {
    let mut dev = Device::new();
    dev.bring_online();
    dev.remote("vw", &["22", "1"]);

    dev.session.dispatcher_mut().client_mut().fail_sends = true;
    dev.remote("vr", &["22"]);
    assert!(dev.sent().is_empty());

    dev.session.dispatcher_mut().client_mut().fail_sends = false;
    dev.remote("vr", &["22"]);
    dev.remote("vr", &["22"]);
    assert_eq!(dev.sent().len(), 1);
}

#[test]
fn unknown_commands_are_ignored() {
    let mut dev = Device::new();
    dev.bring_online();
    dev.remote("dw", &["22", "1"]);
    dev.remote("pm", &["22", "out"]);
    assert_eq!(dev.hw.read(LED), Ok(false));
    assert!(dev.sent().is_empty());
}

#[test]
fn client_injected_events_flow_through_inbound_queue() {
    let inbound: &'static InboundQueue = Box::leak(Box::new(InboundQueue::new()));
    let mut client = NullClient::new();
    client.set_options(&SyncConfig::default().remote);
    client.attach(inbound);
    client.start().unwrap();

    let cmd = RemoteCommand::parse(b"vw\x0022\x001\x00").unwrap();
    assert!(client.inject(ClientEvent::Command(cmd)));

    let mut dev = Device::new();
    while let Some(ev) = inbound.try_next() {
        dev.session.handle(ev);
    }
    assert!(dev.gpio.level(LED));
    assert!(inbound.deliver(ClientEvent::Session(SessionState::Closed)));
}

#[test]
fn local_toggle_and_remote_write_stay_consistent() {
    let dev = Device::new();
    let toggler = {
        let hw = Arc::clone(&dev.hw);
        std::thread::spawn(move || {
            for _ in 0..200 {
                hw.toggle(LED).unwrap();
            }
        })
    };
    let writer = {
        let hw = Arc::clone(&dev.hw);
        std::thread::spawn(move || {
            for i in 0..200 {
                hw.write(LED, i % 3 == 0).unwrap();
            }
        })
    };
    toggler.join().unwrap();
    writer.join().unwrap();

    // The pin always carries the last value the store recorded.
    assert_eq!(dev.hw.read(LED), Ok(dev.gpio.level(LED)));
    assert_eq!(dev.gpio.writes().len(), 1 + 200 + 200);
}

#[test]
fn authentication_behind_command_burst_still_enables_sends() {
    let inbound: &'static InboundQueue = Box::leak(Box::new(InboundQueue::new()));
    let mut dev = Device::new();
    for ev in [LinkEvent::Start, LinkEvent::StationStarted, LinkEvent::Connected, LinkEvent::GotAddress] {
        dev.link_events.post(ev);
    }
    dev.pump_link();
    dev.press(0);
    dev.detector.consume_and_debounce();

    let read = RemoteCommand::new("vr", &["22"]).unwrap();
    for _ in 0..INBOUND_QUEUE_CAP {
        assert!(inbound.deliver(ClientEvent::Command(read.clone())));
    }
    assert!(inbound.deliver(ClientEvent::Session(SessionState::Authenticated)));

    while let Some(ev) = inbound.try_next() {
        dev.session.handle(ev);
        dev.pump_link();
    }
    assert_eq!(dev.supervisor.state(), ConnectionState::Authenticated);
    assert_eq!(dev.sent().len(), 1);
    assert_eq!(inbound.dropped(), 0);
}
