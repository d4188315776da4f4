//! Human and machine readable summaries of a shard's bootstrap outcome.
use std::fmt;

use serde::Serialize;

use crate::{
    bootstrapper::BootstrapOutcome,
    coverage::{Coverage, CoverageError, runs_to_ranges},
    options::TimeBucket,
    shard_result::ShardId,
    time_range::TimeRanges,
};

/// What one shard recovered, and where its holes are.
///
/// Gap figures are bucketed: a bucket counts as missing if any part of it was
/// left unfulfilled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardReport {
    /// The shard summarized.
    pub shard: ShardId,
    /// Number of distinct series recovered.
    pub series: usize,
    /// Number of datapoints recovered.
    pub datapoints: usize,
    /// Exact ranges no source could supply.
    pub unfulfilled: TimeRanges,
    /// Fraction of target buckets fully recovered.
    pub coverage_ratio: f64,
    /// Longest run of missing buckets.
    pub max_gap_buckets: u64,
    /// Missing bucket runs, widened to bucket boundaries.
    pub gaps: TimeRanges,
}

impl ShardReport {
    /// Summarize `outcome`, which was produced for `target`, at `bucket`
    /// granularity.
    pub fn new(
        shard: ShardId,
        target: &TimeRanges,
        outcome: &BootstrapOutcome,
        bucket: &TimeBucket,
    ) -> Result<Self, CoverageError> {
        let expected = Coverage::from_ranges(bucket, target)?;
        let missing = Coverage::from_ranges(bucket, &outcome.unfulfilled)?;
        let present = expected.difference(&missing);

        let gaps = runs_to_ranges(bucket, &present.missing_runs(expected.present()))?;
        let (series, datapoints) = outcome
            .result
            .as_ref()
            .map_or((0, 0), |r| (r.num_series(), r.num_datapoints()));

        Ok(Self {
            shard,
            series,
            datapoints,
            unfulfilled: outcome.unfulfilled.clone(),
            coverage_ratio: present.coverage_ratio(expected.present()),
            max_gap_buckets: present.max_gap_len(expected.present()),
            gaps,
        })
    }

    /// True if nothing was left unfulfilled.
    pub fn is_complete(&self) -> bool {
        self.unfulfilled.is_empty()
    }
}

impl fmt::Display for ShardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shard {}: {} series, {} datapoints, coverage {:.1}%, unfulfilled: {}",
            self.shard,
            self.series,
            self.datapoints,
            self.coverage_ratio * 100.0,
            self.unfulfilled
        )?;
        if self.max_gap_buckets > 0 {
            write!(f, " (longest gap {} bucket(s))", self.max_gap_buckets)?;
        }
        Ok(())
    }
}
