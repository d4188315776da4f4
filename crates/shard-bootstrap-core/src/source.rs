//! The capability every bootstrap strategy implements.
//!
//! A [`Source`] is one way of recovering shard data: peer replication,
//! commit log replay, flushed files, a snapshot cache, and so on. The chain
//! treats it as stateless; anything a source caches is its own business.
//!
//! Sources are shared across chains for different shards and are called
//! concurrently, so implementations must be `Send + Sync`.
use crate::{bootstrapper::BootstrapOutcome, shard_result::ShardId, time_range::TimeRanges};

/// A bootstrap strategy that can report and deliver shard data.
pub trait Source: Send + Sync {
    /// Name used in diagnostics and logs.
    fn name(&self) -> &str;

    /// The part of `requested` this source believes it can supply.
    ///
    /// The returned set must be a subset of `requested`. This is a query and
    /// should have no side effects.
    fn availability(&self, shard: ShardId, requested: &TimeRanges) -> TimeRanges;

    /// Read data for `available`, as previously returned by
    /// [`Source::availability`].
    ///
    /// Anything that could not be delivered, for whatever reason, is reported
    /// in the outcome's unfulfilled ranges rather than as an error.
    fn read(&self, shard: ShardId, available: &TimeRanges) -> BootstrapOutcome;
}
