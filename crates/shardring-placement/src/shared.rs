//! Thread-safe handle to a shard ring
//!
//! The ring and its allocator sit behind one reader-writer lock, so an add
//! or remove is observed by lookups either entirely or not at all.

use crate::ring::ShardRing;
use parking_lot::RwLock;
use shardring_common::{MachineId, MachineLoad, Result, RingConfig, RingStats, ShardPosition};
use std::sync::Arc;

/// Cloneable, shareable ring handle
#[derive(Clone, Debug)]
pub struct SharedRing {
    inner: Arc<RwLock<ShardRing>>,
}

impl SharedRing {
    /// Wrap an existing ring
    #[must_use]
    pub fn new(ring: ShardRing) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ring)),
        }
    }

    /// Build a shared ring from configuration
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the configured shape is invalid.
    pub fn from_config(config: &RingConfig) -> Result<Self> {
        ShardRing::from_config(config).map(Self::new)
    }

    /// See [`ShardRing::add_machine`]
    pub fn add_machine(&self, machine_id: MachineId) -> Vec<ShardPosition> {
        self.inner.write().add_machine(machine_id)
    }

    /// See [`ShardRing::try_add_machine`]
    ///
    /// # Errors
    /// Same as [`ShardRing::try_add_machine`].
    pub fn try_add_machine(&self, machine_id: MachineId) -> Result<Vec<ShardPosition>> {
        self.inner.write().try_add_machine(machine_id)
    }

    /// See [`ShardRing::remove_machine`]
    pub fn remove_machine(&self, machine_id: MachineId) -> Vec<ShardPosition> {
        self.inner.write().remove_machine(machine_id)
    }

    /// See [`ShardRing::machine_for`]
    #[must_use]
    pub fn machine_for(&self, hash_code: u64) -> Option<MachineId> {
        self.inner.read().machine_for(hash_code)
    }

    /// See [`ShardRing::try_machine_for`]
    ///
    /// # Errors
    /// Same as [`ShardRing::try_machine_for`].
    pub fn try_machine_for(&self, hash_code: u64) -> Result<Option<MachineId>> {
        self.inner.read().try_machine_for(hash_code)
    }

    /// Resolve several hash codes under a single read lock
    ///
    /// # Errors
    /// Returns `Error::HashCodeOutOfRange` for the first code outside the domain.
    pub fn machines_for(&self, hash_codes: &[u64]) -> Result<Vec<Option<MachineId>>> {
        let ring = self.inner.read();
        hash_codes
            .iter()
            .map(|&hash_code| ring.try_machine_for(hash_code))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, machine_id: MachineId) -> bool {
        self.inner.read().contains(machine_id)
    }

    /// Positions owned by a machine, copied out of the lock
    #[must_use]
    pub fn shards_of(&self, machine_id: MachineId) -> Option<Vec<ShardPosition>> {
        self.inner.read().shards_of(machine_id).map(<[_]>::to_vec)
    }

    #[must_use]
    pub fn machines(&self) -> Vec<MachineId> {
        self.inner.read().machines()
    }

    /// Consistent summary of the ring at one instant
    #[must_use]
    pub fn snapshot(&self) -> RingStats {
        self.inner.read().stats()
    }

    #[must_use]
    pub fn load(&self) -> Vec<MachineLoad> {
        self.inner.read().load()
    }

    #[must_use]
    pub fn domain_size(&self) -> u64 {
        self.inner.read().domain_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardring_common::Error;
    use std::thread;

    #[test]
    fn test_handles_share_state() {
        let ring = SharedRing::new(ShardRing::with_seed(100, 3, 1));
        let other = ring.clone();

        let shards = ring.add_machine(MachineId::new(1));
        assert_eq!(other.shards_of(MachineId::new(1)), Some(shards));
        assert!(other.contains(MachineId::new(1)));

        other.remove_machine(MachineId::new(1));
        assert_eq!(ring.machine_for(10), None);
    }

    #[test]
    fn test_machines_for_batch() {
        let ring = SharedRing::new(ShardRing::with_seed(100, 3, 2));
        ring.add_machine(MachineId::new(7));

        let owners = ring.machines_for(&[0, 50, 99]).unwrap();
        assert_eq!(owners, vec![Some(MachineId::new(7)); 3]);

        assert!(matches!(
            ring.machines_for(&[0, 100]),
            Err(Error::HashCodeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_from_config_validates() {
        let bad = RingConfig {
            domain_size: 2,
            shards_per_machine: 3,
            seed: None,
        };
        assert!(SharedRing::from_config(&bad).is_err());

        let good = RingConfig::default();
        let ring = SharedRing::from_config(&good).unwrap();
        assert_eq!(ring.domain_size(), 100);
    }

    #[test]
    fn test_concurrent_add_remove_and_lookup() {
        let ring = SharedRing::new(ShardRing::with_seed(10_000, 8, 3));

        let writers: Vec<_> = (0..4u64)
            .map(|t| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for round in 0..200u64 {
                        let machine = MachineId::new(t * 1_000 + round % 25);
                        if round % 2 == 0 {
                            ring.add_machine(machine);
                        } else {
                            ring.remove_machine(machine);
                        }
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4u64)
            .map(|t| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..2_000u64 {
                        let stats = ring.snapshot();
                        assert_eq!(stats.shards as u64 + stats.available, 10_000);
                        assert_eq!(stats.shards, stats.machines * 8);
                        let _ = ring.machine_for((i * 37 + t) % 10_000);
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let stats = ring.snapshot();
        assert_eq!(stats.shards as u64 + stats.available, 10_000);
        for machine in ring.machines() {
            assert_eq!(ring.shards_of(machine).map(|s| s.len()), Some(8));
        }
    }
}
