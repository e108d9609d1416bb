//! GPIO adapter: [`GpioPort`] over the raw register helpers in
//! [`hw_init`](crate::drivers::hw_init).
//!
//! Stateless, so the state store and the edge detector each own a copy.

use crate::app::ports::GpioPort;
use crate::drivers::hw_init;
use crate::pins::PinId;

#[derive(Debug, Clone, Copy, Default)]
pub struct EspGpio;

impl GpioPort for EspGpio {
    fn read_level(&mut self, pin: PinId) -> bool {
        hw_init::gpio_read(pin)
    }

    fn write_level(&mut self, pin: PinId, high: bool) {
        hw_init::gpio_write(pin, high);
    }
}
