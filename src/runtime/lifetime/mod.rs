//! Server lifetime management
//!
//! Startup wiring (storage, services, background tasks) and graceful
//! shutdown with a bounded notification drain.

pub mod shutdown;
pub mod startup;
