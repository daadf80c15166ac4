//! Token Lifecycle
//!
//! Access-token caching and lifecycle orchestration.
//!
//! This module provides:
//!
//! - **Token Cache**: expiry-aware per-account cache with singleflight
//!   refresh collapsing
//! - **Lifecycle Manager**: acquisition, renewal, verification, and
//!   refresh-token rotation

pub mod cache;
pub mod manager;

pub use cache::{TokenCache, SAFETY_MARGIN_SECS};
pub use manager::TokenLifecycleManager;
