//! Links a source together with its successor in a bootstrap chain.
use std::{fmt, panic, sync::Arc, thread};

use log::{debug, warn};

use crate::{
    options::DatabaseOptions,
    shard_result::{ShardId, ShardResult},
    source::Source,
    time_range::TimeRanges,
};

use super::{BootstrapOutcome, Bootstrapper, NoOpBootstrapper};

/// One link of a bootstrap chain: a [`Source`] plus the bootstrapper that
/// handles whatever the source cannot.
///
/// On [`bootstrap`](Bootstrapper::bootstrap) the node:
///
/// 1. returns immediately for an empty request, without touching the source;
/// 2. splits the request into what the source advertises and the remainder;
/// 3. reads the advertised part on the calling thread while the remainder is
///    bootstrapped by `next` on a scoped thread of its own, then joins both;
/// 4. hands anything the source advertised but failed to deliver to `next`
///    once more, after the join;
/// 5. reports as unfulfilled the union of what the fallback and the
///    concurrent delegation could not supply.
pub struct ChainNode {
    source: Arc<dyn Source>,
    opts: Arc<DatabaseOptions>,
    next: Arc<dyn Bootstrapper>,
}

impl ChainNode {
    /// Wrap `source`. Without a `next`, the node delegates to the
    /// [`NoOpBootstrapper`].
    pub fn new(
        source: Arc<dyn Source>,
        opts: Arc<DatabaseOptions>,
        next: Option<Arc<dyn Bootstrapper>>,
    ) -> Self {
        let next = next.unwrap_or_else(|| Arc::new(NoOpBootstrapper) as Arc<dyn Bootstrapper>);
        Self { source, opts, next }
    }

    /// The wrapped source.
    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    /// The bootstrapper this node delegates to.
    pub fn next(&self) -> &Arc<dyn Bootstrapper> {
        &self.next
    }

    fn read_available(&self, shard: ShardId, available: &TimeRanges) -> BootstrapOutcome {
        if available.is_empty() {
            return BootstrapOutcome::empty();
        }
        self.source.read(shard, available)
    }

    /// Fold `results` in order into one fresh accumulator; `None` contributes
    /// nothing.
    fn merge_results<I>(&self, results: I) -> ShardResult
    where
        I: IntoIterator<Item = Option<ShardResult>>,
    {
        let mut merged = ShardResult::new(&self.opts);
        for result in results.into_iter().flatten() {
            merged.add_result(result);
        }
        merged
    }
}

fn merge_ranges<'a, I>(ranges: I) -> TimeRanges
where
    I: IntoIterator<Item = &'a TimeRanges>,
{
    ranges
        .into_iter()
        .fold(TimeRanges::new(), |acc, r| acc.add_ranges(r))
}

impl Bootstrapper for ChainNode {
    fn bootstrap(&self, shard: ShardId, target: &TimeRanges) -> BootstrapOutcome {
        if target.is_empty() {
            return BootstrapOutcome::empty();
        }

        let available = self.source.availability(shard, target);
        debug_assert!(
            available.is_subset_of(target),
            "source {} reported availability outside the requested ranges",
            self.source.name()
        );
        let remaining = target.remove_ranges(&available);

        debug!(
            "shard {shard}: source {self} can supply [{available}], delegating [{remaining}] to {}",
            self.next
        );

        // The delegation gets its own thread so it overlaps the local read
        // even when the caller's rayon pool has no idle workers.
        let (current, delegated) = thread::scope(|scope| {
            let delegation = scope.spawn(|| self.next.bootstrap(shard, &remaining));
            let current = self.read_available(shard, &available);
            let delegated = delegation
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
            (current, delegated)
        });

        let mut merged = self.merge_results([current.result, delegated.result]);

        let mut leftover = current.unfulfilled;
        if !leftover.is_empty() {
            warn!(
                "shard {shard}: source {self} advertised but did not deliver [{leftover}], \
                 retrying with {}",
                self.next
            );
            let fallback = self.next.bootstrap(shard, &leftover);
            if let Some(result) = fallback.result {
                merged.add_result(result);
            }
            leftover = fallback.unfulfilled;
        }

        let unfulfilled = merge_ranges([&leftover, &delegated.unfulfilled]);
        BootstrapOutcome::new(Some(merged), unfulfilled)
    }
}

impl fmt::Display for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source.name())
    }
}

impl fmt::Debug for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainNode")
            .field("source", &self.source.name())
            .field("next", &self.next.to_string())
            .finish_non_exhaustive()
    }
}
