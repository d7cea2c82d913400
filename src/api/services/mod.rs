pub mod affiliate;
pub mod health;

pub use affiliate::routes::affiliate_api_routes;
pub use health::{AppStartTime, HealthService, health_routes};
