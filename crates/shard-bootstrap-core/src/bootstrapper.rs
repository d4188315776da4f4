//! Chain-composable bootstrappers.
//!
//! A bootstrap chain is a right-recursive list of [`ChainNode`]s, each wrapping
//! one [`Source`](crate::source::Source) and pointing at the next
//! [`Bootstrapper`]. Every chain ends in the [`NoOpBootstrapper`], which
//! fulfills nothing and hands its whole request back as unfulfilled. A node
//! built without an explicit `next` gets the no-op terminal, so `next` is
//! always callable.
//!
//! ```text
//!   head ──▶ ChainNode(snapshot) ──▶ ChainNode(peers) ──▶ NoOpBootstrapper
//! ```
//!
//! [`BootstrapChain`] builds such a list from an ordered set of sources.
pub mod chain;
pub mod node;
pub mod noop;

use std::fmt;

pub use chain::{BootstrapChain, BootstrapChainBuilder};
pub use node::ChainNode;
pub use noop::NoOpBootstrapper;

use crate::{shard_result::ShardId, shard_result::ShardResult, time_range::TimeRanges};

/// The data and leftovers produced by a bootstrap step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapOutcome {
    /// Series recovered; `None` when nothing was contributed.
    pub result: Option<ShardResult>,
    /// Requested ranges that could not be supplied.
    pub unfulfilled: TimeRanges,
}

impl BootstrapOutcome {
    /// Build an outcome from its parts.
    pub fn new(result: Option<ShardResult>, unfulfilled: TimeRanges) -> Self {
        Self {
            result,
            unfulfilled,
        }
    }

    /// Nothing recovered and nothing outstanding.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Nothing recovered; all of `ranges` outstanding.
    pub fn unfulfilled(ranges: TimeRanges) -> Self {
        Self {
            result: None,
            unfulfilled: ranges,
        }
    }

    /// `result` recovered with nothing outstanding.
    pub fn fulfilled(result: ShardResult) -> Self {
        Self {
            result: Some(result),
            unfulfilled: TimeRanges::new(),
        }
    }

    /// True if no range was left unfulfilled.
    pub fn is_complete(&self) -> bool {
        self.unfulfilled.is_empty()
    }
}

/// Something that can bootstrap a shard for a set of time ranges.
///
/// Implemented by exactly two types: [`ChainNode`] and the terminal
/// [`NoOpBootstrapper`]. `Display` yields the diagnostic name.
pub trait Bootstrapper: Send + Sync + fmt::Display {
    /// Recover as much of `target` as possible for `shard`.
    ///
    /// The returned unfulfilled set is always a subset of `target`.
    fn bootstrap(&self, shard: ShardId, target: &TimeRanges) -> BootstrapOutcome;
}
