//! Shardring Common - Shared types and utilities
//!
//! This crate provides the identifiers, error definitions and configuration
//! structures used by the placement ring and its tooling.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, LoggingConfig, RingConfig};
pub use error::{Error, Result};
pub use types::*;
