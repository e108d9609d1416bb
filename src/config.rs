//! System configuration parameters
//!
//! All tunable parameters for the PinSync firmware.  Credentials and the
//! remote endpoint are baked in at build time (see
//! [`SyncConfig::from_build_env`]); nothing is persisted by this crate.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pins::{self, PinId};

/// Debounce window and post-toggle hold-off in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u32 = 100;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    // --- Edge detection ---
    /// Minimum interval between accepted edges on one pin, and the
    /// hold-off after each accepted toggle (milliseconds).
    pub debounce_ms: u32,

    // --- Pins ---
    /// Interrupt input that toggles the output.
    pub button_gpio: PinId,
    /// Output kept in sync with the remote peer.
    pub led_gpio: PinId,
    /// Virtual pin id the remote peer uses for the output.
    pub virtual_pin: PinId,

    // --- Network ---
    pub wifi: WifiConfig,

    // --- Remote session ---
    pub remote: RemoteOptions,

    // --- Reconnect policy ---
    pub reconnect: BackoffConfig,
}

/// Station credentials and connect policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String<32>,
    pub password: String<64>,
    /// Connect as soon as the station starts.
    pub auto_connect: bool,
}

/// Options handed to the protocol client before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOptions {
    pub auth_token: String<64>,
    pub server: String<64>,
    /// Connect timeout (milliseconds).
    pub connect_timeout_ms: u32,
    /// Heartbeat interval (seconds).
    pub heartbeat_secs: u16,
    /// Timeout for a single outbound send (milliseconds).
    pub send_timeout_ms: u32,
}

/// Reconnect delay policy.  `initial_ms == 0` reconnects immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    pub initial_ms: u32,
    pub max_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,

            button_gpio: pins::BUTTON_GPIO,
            led_gpio: pins::LED_GPIO,
            virtual_pin: pins::LED_VIRTUAL_PIN,

            wifi: WifiConfig {
                ssid: String::new(),
                password: String::new(),
                auto_connect: true,
            },

            remote: RemoteOptions {
                auth_token: String::new(),
                server: bounded("blynk-cloud.com"),
                connect_timeout_ms: 30_000,
                heartbeat_secs: 10,
                send_timeout_ms: 2_000,
            },

            reconnect: BackoffConfig {
                initial_ms: 0,
                max_ms: 60_000,
            },
        }
    }
}

impl SyncConfig {
    /// Build the configuration from compile-time environment variables.
    ///
    /// `PINSYNC_CONFIG_JSON` (a full [`SyncConfig`] as JSON) replaces the
    /// defaults; the individual `PINSYNC_*` variables then override
    /// credentials and endpoint.
    pub fn from_build_env() -> Result<Self, Error> {
        let mut config = match option_env!("PINSYNC_CONFIG_JSON") {
            Some(json) => Self::from_json(json)?,
            None => Self::default(),
        };
        if let Some(ssid) = option_env!("PINSYNC_WIFI_SSID") {
            config.wifi.ssid = try_bounded(ssid).ok_or(Error::Config("SSID too long"))?;
        }
        if let Some(password) = option_env!("PINSYNC_WIFI_PASSWORD") {
            config.wifi.password =
                try_bounded(password).ok_or(Error::Config("WiFi password too long"))?;
        }
        if let Some(token) = option_env!("PINSYNC_AUTH_TOKEN") {
            config.remote.auth_token =
                try_bounded(token).ok_or(Error::Config("auth token too long"))?;
        }
        if let Some(server) = option_env!("PINSYNC_SERVER") {
            config.remote.server =
                try_bounded(server).ok_or(Error::Config("server address too long"))?;
        }
        Ok(config)
    }

    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|_| Error::Config("malformed configuration JSON"))
    }

    /// Reject values the firmware cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce_ms must be non-zero"));
        }
        if self.button_gpio > pins::MAX_GPIO || self.led_gpio > pins::MAX_GPIO {
            return Err(Error::Config("GPIO number out of range"));
        }
        if self.button_gpio == self.led_gpio {
            return Err(Error::Config("button and LED share a GPIO"));
        }
        // GPIO 34-39 cannot drive an output.
        if self.led_gpio >= 34 {
            return Err(Error::Config("LED GPIO is input-only"));
        }
        if !self.wifi.ssid.is_empty() && !is_printable_ascii(&self.wifi.ssid) {
            return Err(Error::Config("SSID must be printable ASCII"));
        }
        if !self.wifi.password.is_empty() && self.wifi.password.len() < 8 {
            return Err(Error::Config("WPA2 password must be 8-64 bytes"));
        }
        if self.remote.server.is_empty() {
            return Err(Error::Config("remote server not set"));
        }
        if self.remote.auth_token.is_empty() {
            return Err(Error::Config("remote auth token not set"));
        }
        if self.reconnect.initial_ms > self.reconnect.max_ms {
            return Err(Error::Config("reconnect initial_ms above max_ms"));
        }
        Ok(())
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn try_bounded<const N: usize>(s: &str) -> Option<String<N>> {
    let mut out = String::new();
    out.push_str(s).ok()?;
    Some(out)
}

fn bounded<const N: usize>(s: &str) -> String<N> {
    try_bounded(s).unwrap_or_default()
}
