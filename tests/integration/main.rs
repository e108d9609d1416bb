//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a path through the
//! firmware against mock adapters.  All tests run on the host with no
//! real hardware required.

mod mock_hw;
mod reconnect_tests;
mod sync_flow_tests;
