//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`] for the connectivity supervisor and feeds
//! driver notifications back to it as [`LinkEvent`]s:
//!
//! | Driver event             | LinkEvent        |
//! |--------------------------|------------------|
//! | `WifiEvent::StaStarted`  | `StationStarted` |
//! | `WifiEvent::StaConnected`| `Connected`      |
//! | `IpEvent::DhcpIpAssigned`| `GotAddress`     |
//! | `WifiEvent::StaDisconnected` | `Disconnected` |
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation that posts the same events itself.

use log::{info, warn};

use crate::app::ports::NetworkPort;
use crate::config::WifiConfig;
use crate::error::CommsError;
use crate::fsm::{LinkEvent, LinkEventQueue};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    hal::modem::Modem,
    netif::IpEvent,
    nvs::EspDefaultNvsPartition,
    sys::{esp, esp_netif_create_ip6_linklocal, EspError},
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent},
};

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    auto_connect: bool,
    events: &'static LinkEventQueue,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    _subscriptions: [EspSubscription<'static, System>; 2],
    /// Simulation: connect requests seen.
    #[cfg(not(target_os = "espidf"))]
    sim_connects: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_link_local: u32,
}

/// SSID the station should use: the one the driver already has stored,
/// else the compiled-in one.  Empty means "do not start".
pub fn select_ssid(stored: &str, compiled: &heapless::String<32>) -> heapless::String<32> {
    if stored.is_empty() {
        return compiled.clone();
    }
    info!("WiFi: using stored SSID '{}'", stored);
    let mut out = heapless::String::new();
    // `stored` comes from a 32-byte driver field.
    let _ = out.push_str(stored);
    out
}

// ───────────────────────────────────────────────────────────────
// Construction
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        config: &WifiConfig,
        events: &'static LinkEventQueue,
    ) -> Result<Self, EspError> {
        let mut wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        let stored = match wifi.get_configuration()? {
            Configuration::Client(c) | Configuration::Mixed(c, _) => c.ssid,
            _ => heapless::String::new(),
        };
        let ssid = select_ssid(&stored, &config.ssid);
        if stored.is_empty() && !ssid.is_empty() {
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: config.ssid.clone(),
                password: config.password.clone(),
                auth_method: if config.password.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            }))?;
        }

        let wifi_sub = sysloop.subscribe::<WifiEvent, _>(move |event| {
            let mapped = match event {
                WifiEvent::StaStarted => LinkEvent::StationStarted,
                WifiEvent::StaConnected(_) => LinkEvent::Connected,
                WifiEvent::StaDisconnected(_) => LinkEvent::Disconnected,
                _ => return,
            };
            events.post(mapped);
        })?;
        let ip_sub = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let IpEvent::DhcpIpAssigned(_) = event {
                events.post(LinkEvent::GotAddress);
            }
        })?;

        Ok(Self {
            ssid,
            auto_connect: config.auto_connect,
            events,
            wifi,
            _subscriptions: [wifi_sub, ip_sub],
        })
    }

    /// Start the station.  `StaStarted` arrives through the event loop.
    pub fn start(&mut self) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            warn!("WiFi: no SSID configured, station not started");
            return Err(CommsError::StartFailed);
        }
        self.wifi.start().map_err(|e| {
            warn!("WiFi: start failed: {}", e);
            CommsError::StartFailed
        })?;
        info!("WiFi: station started for '{}'", self.ssid);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn simulated(config: &WifiConfig, events: &'static LinkEventQueue) -> Self {
        Self {
            ssid: select_ssid("", &config.ssid),
            auto_connect: config.auto_connect,
            events,
            sim_connects: 0,
            sim_link_local: 0,
        }
    }

    pub fn start(&mut self) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            warn!("WiFi(sim): no SSID configured, station not started");
            return Err(CommsError::StartFailed);
        }
        info!("WiFi(sim): station started for '{}'", self.ssid);
        self.events.post(LinkEvent::StationStarted);
        Ok(())
    }

    pub fn sim_connects(&self) -> u32 {
        self.sim_connects
    }

    pub fn sim_link_local(&self) -> u32 {
        self.sim_link_local
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiAdapter {
    #[cfg(target_os = "espidf")]
    fn connect(&mut self) -> Result<(), CommsError> {
        info!("WiFi: connecting to '{}'", self.ssid);
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect rejected: {}", e);
            CommsError::ConnectFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn connect(&mut self) -> Result<(), CommsError> {
        self.sim_connects = self.sim_connects.wrapping_add(1);
        info!("WiFi(sim): connected to '{}' (attempt {})", self.ssid, self.sim_connects);
        // Runs on the supervisor's own thread: a blocking post could deadlock.
        self.events.try_post(LinkEvent::Connected);
        self.events.try_post(LinkEvent::GotAddress);
        Ok(())
    }

    fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    #[cfg(target_os = "espidf")]
    fn enable_link_local(&mut self) -> Result<(), CommsError> {
        // SAFETY: the STA netif handle is valid while `self.wifi` lives.
        esp!(unsafe { esp_netif_create_ip6_linklocal(self.wifi.sta_netif().handle()) })
            .map_err(|e| {
                warn!("WiFi: IPv6 link-local failed: {}", e);
                CommsError::LinkLocalFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn enable_link_local(&mut self) -> Result<(), CommsError> {
        self.sim_link_local = self.sim_link_local.wrapping_add(1);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
