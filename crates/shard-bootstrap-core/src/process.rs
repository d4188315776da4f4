//! Drives a bootstrap chain across many shards.
//!
//! Shards are independent, so [`BootstrapProcess::run`] fans them out over a
//! dedicated rayon pool of [`DatabaseOptions::bootstrap_concurrency`] threads.
//! That bounds how many shards are in flight; each chain node additionally
//! runs its delegation on a scoped thread of its own.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::info;
use rayon::prelude::*;
use snafu::prelude::*;

use crate::{
    bootstrapper::{BootstrapChain, BootstrapOutcome},
    options::DatabaseOptions,
    shard_result::ShardId,
    time_range::TimeRanges,
};

/// Errors from running a bootstrap process.
#[derive(Debug, Snafu)]
pub enum ProcessError {
    /// The worker pool could not be created.
    #[snafu(display("Failed to build bootstrap thread pool with {threads} threads: {source}"))]
    ThreadPool {
        /// Requested pool size.
        threads: usize,
        /// Underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },
}

/// Runs one [`BootstrapChain`] for a set of shards.
#[derive(Debug, Clone)]
pub struct BootstrapProcess {
    chain: BootstrapChain,
    opts: DatabaseOptions,
}

impl BootstrapProcess {
    /// Pair a chain with the options that size the worker pool and retention
    /// window.
    pub fn new(chain: BootstrapChain, opts: DatabaseOptions) -> Self {
        Self { chain, opts }
    }

    /// The chain each shard is bootstrapped through.
    pub fn chain(&self) -> &BootstrapChain {
        &self.chain
    }

    /// Bootstrap every shard in `shards` for `target`.
    ///
    /// Duplicate shard ids are bootstrapped once. The outcome map is keyed and
    /// ordered by shard id.
    pub fn run(
        &self,
        shards: &[ShardId],
        target: &TimeRanges,
    ) -> Result<BTreeMap<ShardId, BootstrapOutcome>, ProcessError> {
        let mut shards = shards.to_vec();
        shards.sort_unstable();
        shards.dedup();

        if shards.is_empty() {
            return Ok(BTreeMap::new());
        }

        let threads = resolve_threads(self.opts.bootstrap_concurrency, shards.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("shard-bootstrap-{i}"))
            .build()
            .context(ThreadPoolSnafu { threads })?;

        info!(
            "bootstrapping {} shard(s) for [{target}] through {} on {threads} thread(s)",
            shards.len(),
            self.chain
        );

        let outcomes = pool.install(|| {
            shards
                .par_iter()
                .map(|&shard| {
                    let outcome = self.chain.bootstrap(shard, target);
                    info!(
                        "shard {shard}: {} series, {} unfulfilled range(s)",
                        outcome.result.as_ref().map_or(0, |r| r.num_series()),
                        outcome.unfulfilled.len()
                    );
                    (shard, outcome)
                })
                .collect::<Vec<_>>()
        });

        Ok(outcomes.into_iter().collect())
    }

    /// Bootstrap `shards` for the retention window ending at `now`.
    pub fn run_retention_window(
        &self,
        shards: &[ShardId],
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<ShardId, BootstrapOutcome>, ProcessError> {
        let target = TimeRanges::from(self.opts.retention_window(now));
        self.run(shards, &target)
    }
}

/// Thread count for the pool: the configured value, or the number of logical
/// CPUs when it is zero, never more than twice the shard count.
fn resolve_threads(configured: usize, num_shards: usize) -> usize {
    let logical_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let wanted = if configured == 0 {
        logical_threads
    } else {
        configured
    };
    let max_threads = num_shards.saturating_mul(2).max(1);
    wanted.clamp(1, max_threads)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::{
        options::TimeBucket,
        shard_result::{Datapoint, SeriesId},
        sources::memory::{MemoryShard, MemorySource},
        time_range::TimeRange,
    };

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0)
            .single()
            .expect("valid UTC timestamp")
    }

    fn window(a: u32, b: u32) -> TimeRanges {
        TimeRanges::from(TimeRange::new(at(a), at(b)).expect("valid range"))
    }

    fn process(opts: DatabaseOptions) -> BootstrapProcess {
        let source = MemorySource::new("memory", opts.clone())
            .with_shard(
                1,
                MemoryShard::new(window(0, 12))
                    .with_datapoint(SeriesId::from("cpu"), Datapoint::new(at(1), 1.0)),
            )
            .with_shard(2, MemoryShard::new(window(0, 6)));
        let chain = BootstrapChain::builder(opts.clone())
            .source(Arc::new(source))
            .build();
        BootstrapProcess::new(chain, opts)
    }

    #[test]
    fn resolve_threads_respects_config_and_shard_count() {
        assert_eq!(resolve_threads(4, 10), 4);
        assert_eq!(resolve_threads(16, 2), 4);
        assert!(resolve_threads(0, 1) >= 1);
        assert_eq!(resolve_threads(3, 0), 1);
    }

    #[test]
    fn run_reports_each_shard_once() -> Result<(), ProcessError> {
        let opts = DatabaseOptions::new().with_bootstrap_concurrency(2);
        let outcomes = process(opts).run(&[2, 1, 2, 3], &window(0, 12))?;

        assert_eq!(outcomes.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(outcomes[&1].is_complete());
        assert_eq!(outcomes[&2].unfulfilled, window(6, 12));
        assert_eq!(outcomes[&3].unfulfilled, window(0, 12));
        Ok(())
    }

    #[test]
    fn run_with_no_shards_is_empty() -> Result<(), ProcessError> {
        let outcomes = process(DatabaseOptions::new()).run(&[], &window(0, 1))?;
        assert!(outcomes.is_empty());
        Ok(())
    }

    #[test]
    fn retention_window_run_targets_aligned_window() -> Result<(), ProcessError> {
        let opts = DatabaseOptions::new()
            .with_block_size(TimeBucket::Hours(1))
            .with_retention_period(TimeBucket::Hours(6))
            .with_bootstrap_concurrency(1);
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .expect("valid UTC timestamp");

        let outcomes = process(opts).run_retention_window(&[2], now)?;
        // Window is [06:00, 13:00); memory holds [00:00, 06:00) for shard 2.
        assert_eq!(outcomes[&2].unfulfilled, window(6, 13));
        Ok(())
    }
}
