//! # fleetgate-core
//!
//! Core types, configuration, and utilities for Fleetgate.
//!
//! This crate provides the functionality shared across all Fleetgate crates:
//!
//! - **Configuration**: Loading and validation of config files
//! - **Utilities**: Session and correlation ID generation

pub mod config;
pub mod error;
pub mod id;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
