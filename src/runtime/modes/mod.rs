//! Execution modes
//!
//! The service runs as an HTTP server; utility subcommands
//! (`sample-config`) are handled directly in `main`.

pub mod server;

pub use server::run_server;
