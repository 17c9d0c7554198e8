//! # elastic-types
//!
//! Shared types for the elastic-ivf streaming benchmark.
//!
//! ## Modules
//! - [`config`]: layered `Settings` (defaults, config file, `ELASTIC_*` env vars)
//! - [`error`]: configuration errors

pub mod config;
pub mod error;

pub use config::{IndexKind, Settings};
pub use error::ConfigError;
