//! HTTP API: configuration, the authorization gate middleware, routing and
//! request/response mapping.

pub mod app;
pub mod config;
pub mod middleware;

pub use config::{ApiConfig, ConfigError};
