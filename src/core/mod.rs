//! Core Components
//!
//! Shared infrastructure for provider adapters.

pub mod transport;

pub use transport::*;
