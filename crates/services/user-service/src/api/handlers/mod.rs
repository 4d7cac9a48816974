//! HTTP request handlers.

pub mod health_handler;
pub mod metrics_handler;
pub mod user_handler;

pub use health_handler::health_routes;
pub use metrics_handler::metrics_routes;
pub use user_handler::user_routes;
