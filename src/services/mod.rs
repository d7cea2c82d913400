//! Service layer for business logic
//!
//! This module provides unified business logic that can be shared between
//! different interfaces (HTTP API, background jobs).

mod clicks;
mod codes;
mod conversion;
pub mod fraud;
mod ledger;
mod links;
pub mod notify;
mod payouts;
mod registry;
mod withdrawals;

pub use clicks::*;
pub use codes::*;
pub use conversion::*;
pub use fraud::{ClickAssessment, FraudAssessment, FraudCheck, FraudReviewService, FraudScreen};
pub use ledger::*;
pub use links::*;
pub use notify::{LogTransport, NotificationTransport, OutboxDispatcher, WebhookTransport};
pub use payouts::*;
pub use registry::*;
pub use withdrawals::*;
