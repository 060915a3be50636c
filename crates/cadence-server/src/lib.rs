//! Cadence Server
//!
//! HTTP API and configuration for the Cadence review scheduler. The
//! `cadence` binary wraps this with a command-line interface.

pub mod api;
pub mod config;

pub use api::{build_router, serve, AppState};
pub use config::{ConfigError, ConfigOverrides, ServerConfig};
