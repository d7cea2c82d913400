//! System-level modules
//!
//! Logging initialization and other process-level utilities.

pub mod logging;
