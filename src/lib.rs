//! Afflink - affiliate attribution and commission ledger service
//!
//! This library provides the core functionality for the Afflink service:
//! tracking link issuance, click recording with dedup, conversion
//! attribution, the commission ledger state machine, withdrawal
//! processing and outbox-based notifications.
//!
//! # Architecture
//! - `storage`: SeaORM storage backend and ledger transactions
//! - `services`: Business logic (links, clicks, conversion, ledger, payouts)
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging and process-level utilities

pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
