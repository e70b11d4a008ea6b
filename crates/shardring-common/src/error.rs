//! Error types for Shardring
//!
//! This module defines the error type surfaced by the checked (`try_*`)
//! ring operations and by configuration handling.

use crate::types::MachineId;
use thiserror::Error;

/// Common result type for Shardring operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Shardring
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    // Placement errors
    #[error("insufficient shard capacity: have {available} free positions, need {required}")]
    InsufficientCapacity { available: u64, required: u64 },

    #[error("machine already on the ring: {0}")]
    MachineAlreadyPresent(MachineId),

    // Lookup errors
    #[error("hash code {hash_code} outside ring domain [0, {domain_size})")]
    HashCodeOutOfRange { hash_code: u64, domain_size: u64 },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// Capacity frees up as machines leave, so an exhausted ring may
    /// accept the same request later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::InsufficientCapacity { .. })
    }
}
