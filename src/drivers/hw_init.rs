//! One-shot GPIO initialization and raw pin access.
//!
//! Configures the controlled output and the interrupt input using raw
//! ESP-IDF sys calls, and registers the edge ISR.  Called once from
//! `main()` before any task starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::info;

use crate::events::EdgeProducer;
use crate::pins::PinId;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
    IntrEnableFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
            Self::IntrEnableFailed(rc) => write!(f, "GPIO interrupt enable failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

// ── GPIO setup ────────────────────────────────────────────────

/// Output as input/output (readable back) and driven low; input with a
/// falling-edge interrupt.
#[cfg(target_os = "espidf")]
pub fn init_gpio(output: PinId, input: PinId) -> Result<(), HwInitError> {
    let out_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << output,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: single-threaded boot path; the pin mask names one valid GPIO.
    let ret = unsafe { gpio_config(&out_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // SAFETY: the pin was configured as an output just above.
    let ret = unsafe { gpio_set_level(i32::from(output), 0) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // External pull-up on the board; GPIO34-39 have no internal pulls.
    let in_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << input,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    // SAFETY: as above; `in_cfg` outlives the call.
    let ret = unsafe { gpio_config(&in_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: GPIO{} output (low), GPIO{} input (negedge)", output, input);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio(output: PinId, input: PinId) -> Result<(), HwInitError> {
    info!("hw_init(sim): GPIO{} / GPIO{} config skipped", output, input);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: PinId) -> bool {
    // SAFETY: register read on a configured pin; safe from any context.
    (unsafe { gpio_get_level(i32::from(pin)) }) != 0
}

/// Simulation: inputs idle high (released, pulled up).
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: PinId) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: PinId, high: bool) {
    // SAFETY: register write on a pin configured as output in init_gpio().
    unsafe {
        gpio_set_level(i32::from(pin), u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: PinId, _high: bool) {}

// ── GPIO ISR ──────────────────────────────────────────────────

/// Handed to the ISR as its argument.  Leaked: lives as long as the
/// handler is registered, which is forever.  The ISR is the only code
/// that ever touches it, so it owns the producer half outright.
#[cfg(target_os = "espidf")]
struct IsrContext {
    pin: PinId,
    edges: EdgeProducer<'static>,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn edge_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the leaked IsrContext registered below; this
    // handler is its sole user and does not re-enter for the same pin.
    let ctx = unsafe { &mut *arg.cast::<IsrContext>() };
    // SAFETY: RTC counter and level register reads; ISR-safe.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    // SAFETY: as above.
    let level = unsafe { gpio_get_level(i32::from(ctx.pin)) } != 0;
    ctx.edges.on_raw_edge(ctx.pin, level, now_ms);
}

/// Install the per-pin ISR service and route edges on `pin` into `edges`.
#[cfg(target_os = "espidf")]
pub fn install_edge_isr(pin: PinId, edges: EdgeProducer<'static>) -> Result<(), HwInitError> {
    let ctx: &'static mut IsrContext = Box::leak(Box::new(IsrContext { pin, edges }));

    // SAFETY: plain ESP-IDF driver calls on the boot path.
    // ESP_ERR_INVALID_STATE means the service is already installed.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
        return Err(HwInitError::IsrInstallFailed(ret));
    }

    // SAFETY: `ctx` is leaked, so the pointer stays valid for as long as
    // the handler is registered.  `edge_isr` touches only atomics.
    let ret = unsafe {
        gpio_isr_handler_add(
            i32::from(pin),
            Some(edge_isr),
            (ctx as *mut IsrContext).cast(),
        )
    };
    if ret != ESP_OK {
        return Err(HwInitError::IsrHandlerFailed(ret));
    }

    // SAFETY: the pin was configured with an edge interrupt in init_gpio().
    let ret = unsafe { gpio_intr_enable(i32::from(pin)) };
    if ret != ESP_OK {
        return Err(HwInitError::IntrEnableFailed(ret));
    }

    info!("hw_init: edge ISR on GPIO{}", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn install_edge_isr(pin: PinId, _edges: EdgeProducer<'static>) -> Result<(), HwInitError> {
    info!("hw_init(sim): edge ISR on GPIO{} skipped", pin);
    Ok(())
}
