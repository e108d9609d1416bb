//! GPIO / peripheral pin assignments for the PinSync board.
//!
//! Single source of truth: drivers and the default configuration
//! reference this module rather than hard-coding pin numbers.

/// A GPIO number on the ESP32.
pub type PinId = u8;

/// Highest GPIO number present on the ESP32 (GPIO 34–39 are input-only).
pub const MAX_GPIO: PinId = 39;

// ---------------------------------------------------------------------------
// Controlled output
// ---------------------------------------------------------------------------

/// Status LED, configured input/output so its level can be read back.
/// Driven LOW at boot.
pub const LED_GPIO: PinId = 22;

/// Virtual pin the remote peer uses to address the LED.
pub const LED_VIRTUAL_PIN: PinId = 22;

// ---------------------------------------------------------------------------
// User input
// ---------------------------------------------------------------------------

/// Momentary push-button, active-low.  GPIO36 is input-only with no
/// internal pull resistor, so the board carries an external pull-up.
/// Interrupt on the falling edge.
pub const BUTTON_GPIO: PinId = 36;
