//! Notification delivery
//!
//! Outbox dispatcher plus the transports it can deliver through.

mod dispatcher;
mod transport;

pub use dispatcher::OutboxDispatcher;
pub use transport::{LogTransport, NotificationTransport, WebhookTransport};
