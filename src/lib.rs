//! Tee proxy library: forwards every request to a primary backend and
//! replays a copy against a shadow backend for observation.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod shadow;

pub use config::schema::TeeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
