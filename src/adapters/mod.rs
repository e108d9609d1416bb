//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter  | Implements      | Connects to                  |
//! |----------|-----------------|------------------------------|
//! | `gpio`   | GpioPort        | ESP32 GPIO registers         |
//! | `wifi`   | NetworkPort     | ESP-IDF WiFi STA + event loop|
//! | `remote` | ProtocolClient  | Placeholder (no transport)   |

pub mod gpio;
pub mod remote;
pub mod wifi;
