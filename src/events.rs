//! Interrupt-to-task edge handoff.
//!
//! A lock-free single-producer/single-consumer ring.  [`EdgeQueue::split`]
//! hands out exactly one [`EdgeProducer`] (owned by the GPIO ISR) and one
//! [`EdgeConsumer`] (owned by the edge task), so the SPSC discipline is
//! enforced by the borrow checker.  The producer side touches atomics
//! only: no critical section, no waker, no allocation.
//!
//! ```text
//! ┌─────────────┐ enqueue  ┌──────────────┐ dequeue ┌────────────────┐
//! │  GPIO ISR   │─────────▶│  EdgeQueue   │────────▶│ Edge consumer  │
//! │ (never      │  (drops  │  (bounded)   │ (polled)│ task           │
//! │  blocks)    │  if full)│              │         │                │
//! └─────────────┘          └──────────────┘         └────────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::spsc::{Consumer, Producer, Queue};

use crate::pins::PinId;

/// Maximum number of pending edges.
pub const EDGE_QUEUE_CAP: usize = 10;

// One slot of a heapless spsc ring is always left empty.
const RING_SLOTS: usize = EDGE_QUEUE_CAP + 1;

/// One raw interrupt observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub pin: PinId,
    /// Level sampled in the ISR (`true` = high).
    pub level: bool,
    /// Milliseconds since boot, truncated to u32 (wraps after ~49 days).
    pub timestamp_ms: u32,
}

/// Backing storage for the handoff.  Create once, then [`split`](Self::split).
pub struct EdgeQueue {
    ring: Queue<EdgeEvent, RING_SLOTS>,
    dropped: AtomicU32,
}

impl Default for EdgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeQueue {
    pub const fn new() -> Self {
        Self {
            ring: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Hand out the ISR half and the task half.
    pub fn split(&mut self) -> (EdgeProducer<'_>, EdgeConsumer<'_>) {
        let dropped = &self.dropped;
        let (tx, rx) = self.ring.split();
        (EdgeProducer { tx, dropped }, EdgeConsumer { rx, dropped })
    }
}

/// ISR half.
pub struct EdgeProducer<'a> {
    tx: Producer<'a, EdgeEvent, RING_SLOTS>,
    dropped: &'a AtomicU32,
}

impl EdgeProducer<'_> {
    /// Enqueue a raw edge.  Safe to call from interrupt context: never
    /// blocks, never allocates.  Returns `false` if the edge was dropped
    /// because the queue is full.
    pub fn on_raw_edge(&mut self, pin: PinId, level: bool, timestamp_ms: u32) -> bool {
        let event = EdgeEvent {
            pin,
            level,
            timestamp_ms,
        };
        if self.tx.enqueue(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

/// Task half.
pub struct EdgeConsumer<'a> {
    rx: Consumer<'a, EdgeEvent, RING_SLOTS>,
    dropped: &'a AtomicU32,
}

impl EdgeConsumer<'_> {
    /// Pop the next edge without blocking.
    pub fn try_next(&mut self) -> Option<EdgeEvent> {
        self.rx.dequeue()
    }

    /// Number of pending edges.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.rx.ready()
    }

    /// Total edges dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
