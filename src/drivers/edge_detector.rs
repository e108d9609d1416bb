//! Debounced edge detector.
//!
//! ## Hardware
//!
//! Active-low momentary switch with external pull-up.  The GPIO fires on
//! the falling edge; the ISR only enqueues an [`EdgeEvent`] through its
//! [`EdgeProducer`](crate::events::EdgeProducer).  Everything else
//! happens here, in task context, draining the [`EdgeConsumer`].  An
//! empty queue is re-polled every [`EDGE_POLL_MS`].  The window is
//! measured on ISR timestamps, not on consumption time.
//!
//! ## Policy
//!
//! | Step         | Condition                                   | Outcome            |
//! |--------------|---------------------------------------------|--------------------|
//! | Binding      | pin has an [`EdgeBinding`]                  | else dropped       |
//! | Window       | `ts - last_accepted >= debounce_ms`         | else suppressed    |
//! | Level check  | re-read level matches the edge direction    | else ignored       |
//! | Accept       | toggle target, then hold off `debounce_ms`  | window restarts    |
//!
//! The first event on a pin is always inside the window.  Timestamps are
//! u32 milliseconds and compared with wrapping arithmetic.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use heapless::{FnvIndexMap, Vec};
use log::{debug, info, warn};

use crate::app::ports::GpioPort;
use crate::app::state::SharedHardware;
use crate::events::{EdgeConsumer, EdgeEvent};
use crate::pins::PinId;

/// Most inputs one detector serves.  Power of two (index map requirement).
pub const MAX_BINDINGS: usize = 4;

/// Idle re-poll period of the edge queue (one FreeRTOS tick at 100 Hz).
pub const EDGE_POLL_MS: u32 = 10;

/// Which transition counts as a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// High → low; the pin must read low when the edge is accepted.
    Falling,
    /// Low → high; the pin must read high.
    Rising,
}

impl EdgeKind {
    fn settled_level(self) -> bool {
        matches!(self, Self::Rising)
    }
}

/// One input wired to one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeBinding {
    pub input: PinId,
    pub target: PinId,
    pub edge: EdgeKind,
}

/// Per-pin acceptance window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DebounceWindow {
    last_accepted_ms: Option<u32>,
}

impl DebounceWindow {
    fn admits(&self, ts_ms: u32, min_interval_ms: u32) -> bool {
        match self.last_accepted_ms {
            None => true,
            Some(last) => ts_ms.wrapping_sub(last) >= min_interval_ms,
        }
    }
}

/// What became of one queued edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Target toggled to the contained level.
    Toggled(bool),
    /// Inside the debounce window.
    Suppressed,
    /// Pin no longer at the edge's level.
    LevelMismatch,
    /// No binding for the pin.
    Unbound,
    /// The store refused the toggle.
    Failed,
}

pub struct EdgeDetector<'q, G: GpioPort, R: GpioPort, D: DelayNs> {
    edges: EdgeConsumer<'q>,
    hw: Arc<SharedHardware<G>>,
    inputs: R,
    delay: D,
    bindings: Vec<EdgeBinding, MAX_BINDINGS>,
    windows: FnvIndexMap<PinId, DebounceWindow, MAX_BINDINGS>,
    debounce_ms: u32,
    seen_drops: u32,
}

impl<'q, G: GpioPort, R: GpioPort, D: DelayNs> EdgeDetector<'q, G, R, D> {
    /// `inputs` is used only to re-read input levels.
    pub fn new(
        edges: EdgeConsumer<'q>,
        hw: Arc<SharedHardware<G>>,
        inputs: R,
        delay: D,
        debounce_ms: u32,
    ) -> Self {
        Self {
            edges,
            hw,
            inputs,
            delay,
            bindings: Vec::new(),
            windows: FnvIndexMap::new(),
            debounce_ms,
            seen_drops: 0,
        }
    }

    /// Route edges on `binding.input` to `binding.target`.
    pub fn bind(mut self, binding: EdgeBinding) -> Self {
        if self.bindings.push(binding).is_err()
            || self
                .windows
                .insert(binding.input, DebounceWindow::default())
                .is_err()
        {
            warn!("edge: binding table full, GPIO{} ignored", binding.input);
        }
        self
    }

    /// Apply the debounce policy to one event.
    pub fn handle(&mut self, ev: EdgeEvent) -> EdgeOutcome {
        let Some(binding) = self.bindings.iter().find(|b| b.input == ev.pin).copied() else {
            debug!("edge: GPIO{} not bound, dropped", ev.pin);
            return EdgeOutcome::Unbound;
        };
        let window = self.windows.get(&ev.pin).copied().unwrap_or_default();
        if !window.admits(ev.timestamp_ms, self.debounce_ms) {
            debug!("edge: GPIO{} bounce at {} ms suppressed", ev.pin, ev.timestamp_ms);
            return EdgeOutcome::Suppressed;
        }

        // The queued level may be stale by now.
        if self.inputs.read_level(ev.pin) != binding.edge.settled_level() {
            debug!("edge: GPIO{} level changed before handling, ignored", ev.pin);
            return EdgeOutcome::LevelMismatch;
        }

        let level = match self.hw.toggle(binding.target) {
            Ok(level) => level,
            Err(e) => {
                warn!("edge: {}", e);
                return EdgeOutcome::Failed;
            }
        };
        if let Some(w) = self.windows.get_mut(&ev.pin) {
            w.last_accepted_ms = Some(ev.timestamp_ms);
        }
        info!("edge: GPIO{} -> GPIO{} now {}", ev.pin, binding.target, u8::from(level));

        self.delay.delay_ms(self.debounce_ms);
        EdgeOutcome::Toggled(level)
    }

    /// Block for the next queued edge and handle it.
    pub fn consume_and_debounce(&mut self) -> EdgeOutcome {
        let ev = loop {
            if let Some(ev) = self.edges.try_next() {
                break ev;
            }
            self.delay.delay_ms(EDGE_POLL_MS);
        };
        let dropped = self.edges.dropped();
        if dropped != self.seen_drops {
            debug!("edge: {} edges lost to a full queue", dropped.wrapping_sub(self.seen_drops));
            self.seen_drops = dropped;
        }
        self.handle(ev)
    }

    /// Task body.
    pub fn run(mut self) -> ! {
        info!(
            "edge: consumer running ({} binding(s), {} ms window)",
            self.bindings.len(),
            self.debounce_ms
        );
        loop {
            self.consume_and_debounce();
        }
    }
}
