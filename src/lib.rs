//! PinSync firmware library.
//!
//! Keeps one GPIO output in sync with a remote virtual pin: a debounced
//! button toggles it locally, the remote peer reads and writes it, and a
//! connectivity supervisor keeps the session alive.
//!
//! Exposes the pure-logic modules for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod pins;

pub mod adapters;
pub mod drivers;
