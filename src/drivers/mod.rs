//! Edge detection, hardware initialisation, and task placement.

pub mod edge_detector;
pub mod hw_init;
pub mod task_pin;
