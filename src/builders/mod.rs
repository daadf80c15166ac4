//! Builders
//!
//! Fluent builder patterns for adapter configuration.

pub mod config;

pub use config::{adapter_config, AdapterConfigBuilder};
