//! HTTP API handlers

pub mod auth;
pub mod dataset;
pub mod error_text;
pub mod evaluation;
pub mod export;
pub mod health;

pub use auth::admin_auth_middleware;
pub use dataset::dataset_routes;
pub use error_text::error_text_routes;
pub use evaluation::evaluation_routes;
pub use export::export_routes;
pub use health::health_routes;
