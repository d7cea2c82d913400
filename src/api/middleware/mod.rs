pub mod auth;
pub mod request_id;

pub use auth::ServiceAuth;
pub use request_id::{RequestId, RequestIdMiddleware};
