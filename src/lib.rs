//! # Backend Forge
//!
//! REST aggregator over a handful of unrelated public data providers.
//!
//! Modules:
//! - `config`: YAML service configuration, normalization and validation
//! - `credentials`: signed bearer token minting and time-bound caching
//! - `resilience`: upstream error taxonomy and the partial-failure fan-out
//! - `providers`: outbound transport and one adapter per data provider
//! - `server`: axum routes, response envelope and lifecycle
//! - `observability`: prometheus registry and its scrape route

pub mod config;
pub mod credentials;
pub mod helpers;
pub mod observability;
pub mod providers;
pub mod resilience;
pub mod server;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::service::ServiceConfig;
