//! Core engine for bootstrapping the shards of a time-series storage node.
//!
//! When a node starts it must rebuild the series data of every shard it owns
//! over the retention window. Several strategies can supply that data (flushed
//! files, commit log replay, peer replication, caches) and none is complete
//! on its own. This crate chains them:
//!
//! - Half-open time ranges and normalized range sets with union, difference
//!   and intersection (`time_range` module).
//! - The [`Source`](source::Source) capability a strategy implements.
//! - Chain nodes that read what their source advertises while delegating the
//!   remainder down the chain concurrently, ending in a no-op terminal
//!   (`bootstrapper` module).
//! - Per-shard series accumulation with block-aligned merging
//!   (`shard_result` module).
//! - A process driver that fans a chain out over many shards on a bounded
//!   rayon pool (`process` module).
//! - RoaringBitmap-based coverage and gap reports (`coverage`, `report`).
//!
//! Higher-level crates (a facade, a CLI, node wiring) depend on this crate
//! rather than re-implementing the chain semantics.
#![deny(missing_docs)]
pub mod bootstrapper;
pub mod coverage;
pub mod helpers;
pub mod options;
pub mod process;
pub mod report;
pub mod shard_result;
pub mod source;
pub mod sources;
pub mod time_range;
