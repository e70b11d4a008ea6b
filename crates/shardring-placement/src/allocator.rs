//! Unique random draws from `[0, N)` without materializing the domain
//!
//! The allocator keeps an implicit array `A[0..N)` that starts as the
//! identity permutation. Only slots that have been swapped are stored, so
//! memory grows with the number of draws rather than with `N`.
//!
//! ```text
//!  active window [0, remaining)        drawn
//! +----+----+----+----+----+----+ ... +----+
//! | A0 | A1 | .. | Ar | .. | An |     |    |
//! +----+----+----+----+----+----+ ... +----+
//!              ^ ri           ^ remaining - 1 moves into ri
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardring_common::ShardPosition;
use std::collections::HashMap;
use tracing::{trace, warn};

/// Draws positions uniformly without replacement until they are freed
#[derive(Debug)]
pub struct UniqueDrawAllocator {
    /// Size of the domain (N)
    domain_size: u64,
    /// Values never drawn since the last reinit live in `[0, remaining)`
    remaining: u64,
    /// Sparse permutation: slot index -> value currently sitting there
    swap_table: HashMap<u64, ShardPosition>,
    /// Values handed back through `free`, served LIFO before fresh draws
    freed: Vec<ShardPosition>,
    rng: StdRng,
}

impl UniqueDrawAllocator {
    /// Create an allocator over `[0, domain_size)` seeded from OS entropy
    ///
    /// # Panics
    /// Panics if `domain_size` is zero.
    #[must_use]
    pub fn new(domain_size: u64) -> Self {
        Self::with_rng(domain_size, StdRng::from_entropy())
    }

    /// Create an allocator with a deterministic draw sequence
    ///
    /// # Panics
    /// Panics if `domain_size` is zero.
    #[must_use]
    pub fn with_seed(domain_size: u64, seed: u64) -> Self {
        Self::with_rng(domain_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(domain_size: u64, rng: StdRng) -> Self {
        assert!(domain_size > 0, "allocator domain must be non-empty");
        Self {
            domain_size,
            remaining: domain_size,
            swap_table: HashMap::new(),
            freed: Vec::new(),
            rng,
        }
    }

    /// Draw a value not currently handed out
    ///
    /// Freed values are reused first. When every value has been drawn and
    /// none is free the window is reinitialized to the full domain, so
    /// callers that need uniqueness must check [`available`](Self::available)
    /// first.
    pub fn draw(&mut self) -> ShardPosition {
        if let Some(value) = self.freed.pop() {
            trace!(value, "reusing freed position");
            return value;
        }

        if self.remaining == 0 {
            warn!(
                domain_size = self.domain_size,
                "every position drawn and none freed, reinitializing allocator"
            );
            self.reinit();
        }

        let ri = self.rng.gen_range(0..self.remaining);
        let value = self.slot(ri);

        self.remaining -= 1;
        let boundary = self.remaining;
        let moved = self.swap_table.remove(&boundary).unwrap_or(boundary);
        if ri != boundary {
            self.swap_table.insert(ri, moved);
        }

        value
    }

    /// Return a previously drawn value to the pool
    ///
    /// # Panics
    /// Panics if `value` is outside the domain.
    pub fn free(&mut self, value: ShardPosition) {
        assert!(
            value < self.domain_size,
            "freed position {value} outside domain [0, {})",
            self.domain_size
        );
        self.freed.push(value);
    }

    /// Reset the window to the full domain and forget all swaps
    ///
    /// Only valid once every value has been drawn and none is freed.
    fn reinit(&mut self) {
        debug_assert!(self.freed.is_empty(), "reinit with freed values pending");
        self.remaining = self.domain_size;
        self.swap_table.clear();
    }

    /// Size of the domain (N)
    #[must_use]
    pub const fn domain_size(&self) -> u64 {
        self.domain_size
    }

    /// Values never drawn since the last reinit
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Values freed and waiting for reuse
    #[must_use]
    pub fn freed(&self) -> u64 {
        self.freed.len() as u64
    }

    /// Values that can be drawn without repeating one in use
    #[must_use]
    pub fn available(&self) -> u64 {
        self.remaining + self.freed()
    }

    /// Number of materialized swap-table entries
    #[must_use]
    pub fn swap_entries(&self) -> usize {
        self.swap_table.len()
    }

    fn slot(&self, index: u64) -> ShardPosition {
        self.swap_table.get(&index).copied().unwrap_or(index)
    }
}
