//! Shardring Placement - micro-shard consistent hashing
//!
//! This crate maps hash codes onto a changing set of machines. Each machine
//! is given `k` randomly drawn positions ("micro-shards") on a ring of `N`
//! slots, which keeps load balanced as machines join and leave.
//!
//! # Components
//!
//! ## Unique-Draw Allocator
//! Draws positions uniformly without replacement using a sparse
//! Fisher-Yates swap table, so cost scales with draws rather than `N`.
//!
//! ## Shard Ring
//! Tracks position -> machine in an ordered map and answers lookups by
//! clockwise successor search with wraparound.
//!
//! # Example
//! ```
//! use shardring_common::MachineId;
//! use shardring_placement::ShardRing;
//!
//! let mut ring = ShardRing::with_seed(100, 3, 42);
//! let shards = ring.add_machine(MachineId::new(1));
//! assert_eq!(shards.len(), 3);
//! assert_eq!(ring.machine_for(4), Some(MachineId::new(1)));
//! ```

pub mod allocator;
pub mod ring;
pub mod shared;

pub use allocator::UniqueDrawAllocator;
pub use ring::ShardRing;
pub use shared::SharedRing;
