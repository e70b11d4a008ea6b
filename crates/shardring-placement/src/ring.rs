//! Micro-shard consistent hashing ring
//!
//! Every machine receives `k` randomly drawn positions on a ring of `N`
//! slots. A hash code belongs to the machine owning the first shard at or
//! clockwise after it, wrapping from `N - 1` back to `0`.

use crate::allocator::UniqueDrawAllocator;
use shardring_common::{
    Error, MachineId, MachineLoad, Result, RingConfig, RingStats, ShardPosition,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Consistent hashing ring with randomly placed micro-shards
#[derive(Debug)]
pub struct ShardRing {
    /// Number of shards each machine owns (k)
    shards_per_machine: u64,
    /// Shard position -> owning machine, ordered for successor lookup
    positions: BTreeMap<ShardPosition, MachineId>,
    /// Machine -> its shard positions, in draw order
    machines: HashMap<MachineId, Vec<ShardPosition>>,
    allocator: UniqueDrawAllocator,
}

impl ShardRing {
    /// Create a ring over `[0, domain_size)` with random placement
    ///
    /// # Panics
    /// Panics unless `0 < shards_per_machine <= domain_size`.
    #[must_use]
    pub fn new(domain_size: u64, shards_per_machine: u64) -> Self {
        assert_shape(domain_size, shards_per_machine);
        Self::with_allocator(
            shards_per_machine,
            UniqueDrawAllocator::new(domain_size),
        )
    }

    /// Create a ring whose placement is reproducible from `seed`
    ///
    /// # Panics
    /// Panics unless `0 < shards_per_machine <= domain_size`.
    #[must_use]
    pub fn with_seed(domain_size: u64, shards_per_machine: u64, seed: u64) -> Self {
        assert_shape(domain_size, shards_per_machine);
        Self::with_allocator(
            shards_per_machine,
            UniqueDrawAllocator::with_seed(domain_size, seed),
        )
    }

    /// Create a ring, reporting an invalid shape as an error
    ///
    /// # Errors
    /// Returns `Error::Configuration` unless `0 < shards_per_machine <= domain_size`.
    pub fn try_new(domain_size: u64, shards_per_machine: u64, seed: Option<u64>) -> Result<Self> {
        Self::from_config(&RingConfig {
            domain_size,
            shards_per_machine,
            seed,
        })
    }

    /// Create a ring from configuration
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the configured shape is invalid.
    pub fn from_config(config: &RingConfig) -> Result<Self> {
        config.validate()?;
        Ok(match config.seed {
            Some(seed) => Self::with_seed(config.domain_size, config.shards_per_machine, seed),
            None => Self::new(config.domain_size, config.shards_per_machine),
        })
    }

    fn with_allocator(shards_per_machine: u64, allocator: UniqueDrawAllocator) -> Self {
        Self {
            shards_per_machine,
            positions: BTreeMap::new(),
            machines: HashMap::new(),
            allocator,
        }
    }

    /// Add a machine and return the positions drawn for it
    ///
    /// Returns an empty placement if the ring lacks capacity for `k` more
    /// shards or the machine is already present; the ring is unchanged in
    /// both cases.
    pub fn add_machine(&mut self, machine_id: MachineId) -> Vec<ShardPosition> {
        match self.try_add_machine(machine_id) {
            Ok(shards) => shards,
            Err(e) => {
                warn!(%machine_id, error = %e, "machine not added");
                Vec::new()
            }
        }
    }

    /// Add a machine, reporting why it could not be placed
    ///
    /// # Errors
    /// Returns `Error::MachineAlreadyPresent` if the machine owns shards
    /// already, or `Error::InsufficientCapacity` if fewer than `k`
    /// positions are free.
    pub fn try_add_machine(&mut self, machine_id: MachineId) -> Result<Vec<ShardPosition>> {
        if self.machines.contains_key(&machine_id) {
            return Err(Error::MachineAlreadyPresent(machine_id));
        }

        let available = self.allocator.available();
        if available < self.shards_per_machine {
            return Err(Error::InsufficientCapacity {
                available,
                required: self.shards_per_machine,
            });
        }

        let mut shards = Vec::new();
        for _ in 0..self.shards_per_machine {
            let position = self.allocator.draw();
            let previous = self.positions.insert(position, machine_id);
            debug_assert!(previous.is_none(), "position {position} drawn twice");
            shards.push(position);
        }

        self.machines.insert(machine_id, shards.clone());
        debug!(%machine_id, shards = shards.len(), "added machine to ring");

        Ok(shards)
    }

    /// Remove a machine and free its positions for reuse
    ///
    /// Unknown machines are ignored. Returns the positions released.
    pub fn remove_machine(&mut self, machine_id: MachineId) -> Vec<ShardPosition> {
        let Some(shards) = self.machines.remove(&machine_id) else {
            return Vec::new();
        };

        for &position in &shards {
            self.allocator.free(position);
            self.positions.remove(&position);
        }

        debug!(%machine_id, shards = shards.len(), "removed machine from ring");
        shards
    }

    /// Machine owning `hash_code`, or `None` if the ring is empty
    ///
    /// # Panics
    /// Panics if `hash_code` is outside `[0, domain_size)`.
    #[must_use]
    pub fn machine_for(&self, hash_code: u64) -> Option<MachineId> {
        assert!(
            hash_code < self.domain_size(),
            "hash code {hash_code} outside ring domain [0, {})",
            self.domain_size()
        );

        self.positions
            .range(hash_code..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(_, &machine_id)| machine_id)
    }

    /// Checked variant of [`machine_for`](Self::machine_for)
    ///
    /// # Errors
    /// Returns `Error::HashCodeOutOfRange` if `hash_code >= domain_size`.
    pub fn try_machine_for(&self, hash_code: u64) -> Result<Option<MachineId>> {
        if hash_code >= self.domain_size() {
            return Err(Error::HashCodeOutOfRange {
                hash_code,
                domain_size: self.domain_size(),
            });
        }
        Ok(self.machine_for(hash_code))
    }

    /// Whether the machine currently owns shards
    #[must_use]
    pub fn contains(&self, machine_id: MachineId) -> bool {
        self.machines.contains_key(&machine_id)
    }

    /// Positions owned by a machine, in draw order
    #[must_use]
    pub fn shards_of(&self, machine_id: MachineId) -> Option<&[ShardPosition]> {
        self.machines.get(&machine_id).map(Vec::as_slice)
    }

    /// All machines on the ring, sorted
    #[must_use]
    pub fn machines(&self) -> Vec<MachineId> {
        let mut ids: Vec<_> = self.machines.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate shard positions in ring order
    pub fn shards(&self) -> impl Iterator<Item = (ShardPosition, MachineId)> + '_ {
        self.positions.iter().map(|(&p, &m)| (p, m))
    }

    #[must_use]
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Size of the ring (N)
    #[must_use]
    pub const fn domain_size(&self) -> u64 {
        self.allocator.domain_size()
    }

    /// Shards per machine (k)
    #[must_use]
    pub const fn shards_per_machine(&self) -> u64 {
        self.shards_per_machine
    }

    /// Positions that can still be assigned
    #[must_use]
    pub fn available(&self) -> u64 {
        self.allocator.available()
    }

    /// Summary counters
    #[must_use]
    pub fn stats(&self) -> RingStats {
        RingStats {
            domain_size: self.domain_size(),
            shards_per_machine: self.shards_per_machine,
            machines: self.machine_count(),
            shards: self.shard_count(),
            available: self.available(),
        }
    }

    /// Exact number of hash codes each machine answers for
    ///
    /// A shard at `p` owns `(prev, p]` where `prev` is the preceding shard;
    /// the lowest shard also owns the tail past the highest one. The result
    /// is sorted by machine and sums to `domain_size` on a non-empty ring.
    #[must_use]
    pub fn load(&self) -> Vec<MachineLoad> {
        let mut owned: HashMap<MachineId, u64> = HashMap::new();

        let Some((&last, _)) = self.positions.iter().next_back() else {
            return Vec::new();
        };

        let mut prev: Option<ShardPosition> = None;
        for (&position, &machine_id) in &self.positions {
            let arc = match prev {
                Some(p) => position - p,
                None => position + (self.domain_size() - last),
            };
            *owned.entry(machine_id).or_default() += arc;
            prev = Some(position);
        }

        let mut loads: Vec<MachineLoad> = owned
            .into_iter()
            .map(|(machine_id, owned)| MachineLoad {
                machine_id,
                shards: self.machines.get(&machine_id).map_or(0, Vec::len),
                owned,
            })
            .collect();
        loads.sort_by_key(|l| l.machine_id);
        loads
    }
}

fn assert_shape(domain_size: u64, shards_per_machine: u64) {
    assert!(domain_size > 0, "ring domain must be non-empty");
    assert!(shards_per_machine > 0, "machines need at least one shard");
    assert!(
        shards_per_machine <= domain_size,
        "{shards_per_machine} shards per machine exceed domain of {domain_size}"
    );
}
