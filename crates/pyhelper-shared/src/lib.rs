//! # pyhelper Shared
//!
//! Shared types, errors, and configuration for pyhelper.
//! This crate provides the foundation types used across all pyhelper components.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use types::*;

/// Version information for pyhelper
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
