//! PinSync firmware entry point.
//!
//! ```text
//! ┌──────────┐  EdgeQueue   ┌───────────────┐
//! │ GPIO ISR │─────────────▶│ edge consumer │──┐ toggle
//! └──────────┘              └───────────────┘  ▼
//!                                        ┌────────────────┐
//! ┌──────────┐ LinkEventQueue            │ SharedHardware │
//! │ WiFi evt │──────────┐                └────────────────┘
//! └──────────┘          ▼                      ▲ write / notify
//!                ┌────────────┐ LinkStatus ┌─────────┐ InboundQueue ┌────────┐
//!                │ supervisor │───────────▶│ session │◀─────────────│ client │
//!                └────────────┘            └─────────┘              └────────┘
//! ```
//!
//! Boot wires the queues and adapters, spawns the three tasks, and parks.

use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use pinsync::adapters::gpio::EspGpio;
use pinsync::adapters::remote::NullClient;
use pinsync::adapters::wifi::WifiAdapter;
use pinsync::app::dispatcher::CommandDispatcher;
use pinsync::app::ports::ProtocolClient;
use pinsync::app::session::{InboundQueue, RemoteSession};
use pinsync::app::state::{HardwareState, SharedHardware};
use pinsync::app::sync::StateSynchronizer;
use pinsync::config::SyncConfig;
use pinsync::drivers::edge_detector::{EdgeBinding, EdgeDetector, EdgeKind};
use pinsync::drivers::hw_init;
use pinsync::drivers::task_pin::{spawn_on_core, Core, TaskSpec};
use pinsync::events::EdgeQueue;
use pinsync::fsm::{ConnectivitySupervisor, LinkEvent, LinkEventQueue, LinkStatus};

// ── Task placement ────────────────────────────────────────────

const EDGE_TASK: TaskSpec = TaskSpec {
    name: "edge\0",
    core: Core::App,
    priority: 10,
    stack_kb: 4,
};

const SUPERVISOR_TASK: TaskSpec = TaskSpec {
    name: "link\0",
    core: Core::Pro,
    priority: 5,
    stack_kb: 4,
};

const SESSION_TASK: TaskSpec = TaskSpec {
    name: "session\0",
    core: Core::App,
    priority: 5,
    stack_kb: 6,
};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PinSync v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (compiled in) ────────────────────────
    let config = SyncConfig::from_build_env()?;
    config.validate()?;
    info!(
        "Config: button=GPIO{} led=GPIO{} V{} debounce={}ms",
        config.button_gpio, config.led_gpio, config.virtual_pin, config.debounce_ms
    );

    // ── 3. GPIO + edge ISR ────────────────────────────────────
    hw_init::init_gpio(config.led_gpio, config.button_gpio)?;
    let (edge_tx, edge_rx) = Box::leak(Box::new(EdgeQueue::new())).split();
    hw_init::install_edge_isr(config.button_gpio, edge_tx)?;

    let hw = Arc::new(SharedHardware::new(HardwareState::new(
        EspGpio,
        &[config.led_gpio],
    )?));

    // ── 4. Shared queues and status ───────────────────────────
    let link_events: &'static LinkEventQueue = Box::leak(Box::new(LinkEventQueue::new()));
    let inbound: &'static InboundQueue = Box::leak(Box::new(InboundQueue::new()));
    let link = Arc::new(LinkStatus::new());

    // ── 5. Edge consumer ──────────────────────────────────────
    let detector = EdgeDetector::new(edge_rx, Arc::clone(&hw), EspGpio, FreeRtos, config.debounce_ms)
        .bind(EdgeBinding {
            input: config.button_gpio,
            target: config.led_gpio,
            edge: EdgeKind::Falling,
        });
    spawn_on_core(EDGE_TASK, move || detector.run())?;

    // ── 6. WiFi + connectivity supervisor ─────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs, &config.wifi, link_events)?;

    // Queued ahead of StaStarted so the supervisor leaves Idle first.
    link_events.post(LinkEvent::Start);
    if let Err(e) = wifi.start() {
        warn!("WiFi unavailable ({}), running local-only", e);
    }

    let supervisor = ConnectivitySupervisor::new(wifi, FreeRtos, Arc::clone(&link), config.reconnect);
    spawn_on_core(SUPERVISOR_TASK, move || supervisor.run(link_events))?;

    // ── 7. Remote session ─────────────────────────────────────
    let mut client = NullClient::new();
    client.set_options(&config.remote);
    client.attach(inbound);
    client.start()?;

    let session = RemoteSession::new(
        CommandDispatcher::standard(client, Arc::clone(&link)),
        StateSynchronizer::new(Arc::clone(&hw), config.virtual_pin, config.led_gpio),
        link_events,
    );
    spawn_on_core(SESSION_TASK, move || session.run(inbound))?;

    info!("System ready.");
    loop {
        std::thread::park();
    }
}
