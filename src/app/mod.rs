//! Application core: pure domain logic, zero I/O.
//!
//! The hardware state store, the state synchronizer, command parsing and
//! dispatch, and the remote-session task.  All interaction with pins and
//! the network happens through the **port traits** in [`ports`], so this
//! layer runs unchanged on the host in tests.

pub mod commands;
pub mod dispatcher;
pub mod ports;
pub mod session;
pub mod state;
pub mod sync;
