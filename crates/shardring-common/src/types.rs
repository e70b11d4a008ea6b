//! Core type definitions for Shardring
//!
//! This module defines the identifiers and reporting structures shared by
//! the placement ring, its concurrent handle and the admin tooling.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// A point on the ring, in `[0, domain_size)`
pub type ShardPosition = u64;

/// Caller-supplied identifier of a machine owning shards on the ring
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct MachineId(u64);

impl MachineId {
    /// Create a machine ID from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Point-in-time summary of a ring
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingStats {
    /// Total number of addressable positions (N)
    pub domain_size: u64,
    /// Shards assigned to every machine (k)
    pub shards_per_machine: u64,
    /// Machines currently on the ring
    pub machines: usize,
    /// Shard positions currently owned
    pub shards: usize,
    /// Positions that can still be handed out
    pub available: u64,
}

impl RingStats {
    /// Number of additional machines the ring can accept right now
    #[must_use]
    pub const fn machine_headroom(&self) -> u64 {
        if self.shards_per_machine == 0 {
            return 0;
        }
        self.available / self.shards_per_machine
    }
}

/// How much of the ring a single machine answers for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineLoad {
    /// The machine
    pub machine_id: MachineId,
    /// Shard positions it owns
    pub shards: usize,
    /// Hash codes in `[0, domain_size)` that resolve to it
    pub owned: u64,
}

impl MachineLoad {
    /// Fraction of the ring owned, in `[0.0, 1.0]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn share(&self, domain_size: u64) -> f64 {
        if domain_size == 0 {
            return 0.0;
        }
        self.owned as f64 / domain_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_id_conversions() {
        let id = MachineId::from(7);
        assert_eq!(u64::from(id), 7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(MachineId::new(7), id);
    }

    #[test]
    fn test_machine_id_serializes_as_integer() {
        let load = MachineLoad {
            machine_id: MachineId::new(3),
            shards: 2,
            owned: 40,
        };
        let toml = toml::to_string(&load).unwrap();
        assert!(toml.contains("machine_id = 3"));
    }

    #[test]
    fn test_machine_headroom() {
        let stats = RingStats {
            domain_size: 100,
            shards_per_machine: 3,
            machines: 1,
            shards: 3,
            available: 97,
        };
        assert_eq!(stats.machine_headroom(), 32);
    }

    #[test]
    fn test_load_share() {
        let load = MachineLoad {
            machine_id: MachineId::new(1),
            shards: 3,
            owned: 25,
        };
        assert!((load.share(100) - 0.25).abs() < f64::EPSILON);
        assert!(load.share(0).abs() < f64::EPSILON);
    }
}
