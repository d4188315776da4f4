//! Bucketed coverage and gap analysis for bootstrap outcomes.
//!
//! Time ranges are exact, but operators usually want a coarser answer:
//! "how much of the last two days did shard 7 recover, and where are the
//! holes?". This module maps [`TimeRanges`] onto epoch-aligned buckets
//! (see [`crate::helpers::time_bucket`]) stored in a `RoaringBitmap`, and
//! answers ratio and gap questions over them.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use shard_bootstrap_core::{
//!     coverage::Coverage,
//!     options::TimeBucket,
//!     time_range::{TimeRange, TimeRanges},
//! };
//!
//! let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
//! let spec = TimeBucket::Hours(1);
//!
//! let target = TimeRanges::from(TimeRange::new(t(0), t(10)).unwrap());
//! let missing = TimeRanges::from(TimeRange::new(t(5), t(6)).unwrap());
//!
//! let expected = Coverage::from_ranges(&spec, &target).unwrap();
//! let present = expected.difference(&Coverage::from_ranges(&spec, &missing).unwrap());
//!
//! assert!((present.coverage_ratio(expected.present()) - 0.9).abs() < 1e-9);
//! assert_eq!(present.max_gap_len(expected.present()), 1);
//! ```

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;
use snafu::prelude::*;

use crate::{
    helpers::time_bucket::{bucket_range, bucket_start},
    options::TimeBucket,
    time_range::{TimeRange, TimeRanges},
};

/// Bucket ids stored in a coverage bitmap.
///
/// `u32` is enough for second buckets until 2106 and for minute buckets far
/// beyond that.
pub type Bucket = u32;

/// Errors raised while mapping time onto buckets.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum CoverageError {
    /// A bucket id does not fit the `u32` bucket domain.
    #[snafu(display("Bucket id {bucket_id} does not fit into u32 bucket domain"))]
    BucketOverflow {
        /// The computed bucket id.
        bucket_id: i64,
    },

    /// A range starts before the Unix epoch, which coverage cannot represent.
    #[snafu(display(
        "Coverage cannot represent time before the Unix epoch (bucket id {bucket_id})"
    ))]
    BeforeEpoch {
        /// The negative bucket id.
        bucket_id: i64,
    },

    /// A bucket id has no representable start timestamp.
    #[snafu(display("Bucket id {bucket_id} has no representable start time"))]
    BucketOutOfRange {
        /// The offending bucket id.
        bucket_id: u64,
    },
}

/// A set of buckets known to be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    bitmap: RoaringBitmap,
}

impl Coverage {
    /// No bucket present.
    pub fn empty() -> Self {
        Self {
            bitmap: RoaringBitmap::new(),
        }
    }

    /// Wrap an existing bitmap.
    pub fn from_bitmap(bitmap: RoaringBitmap) -> Self {
        Self { bitmap }
    }

    /// Every bucket intersecting any range of `ranges`.
    ///
    /// Zero-duration ranges contribute nothing.
    pub fn from_ranges(spec: &TimeBucket, ranges: &TimeRanges) -> Result<Self, CoverageError> {
        let mut bitmap = RoaringBitmap::new();
        for range in ranges {
            let Some(ids) = bucket_range(spec, range) else {
                continue;
            };
            let (first, last) = (to_bucket(*ids.start())?, to_bucket(*ids.end())?);
            bitmap.insert_range(first..=last);
        }
        Ok(Self { bitmap })
    }

    /// Borrow the bitmap of present buckets.
    pub fn present(&self) -> &RoaringBitmap {
        &self.bitmap
    }

    /// `self ∪ other`.
    pub fn union(&self, other: &Coverage) -> Coverage {
        Coverage {
            bitmap: &self.bitmap | &other.bitmap,
        }
    }

    /// `self - other`.
    pub fn difference(&self, other: &Coverage) -> Coverage {
        Coverage {
            bitmap: &self.bitmap - &other.bitmap,
        }
    }

    /// Number of buckets present.
    pub fn cardinality(&self) -> u64 {
        self.bitmap.len()
    }

    /// Buckets expected but not present: `expected - present`.
    pub fn missing_points(&self, expected: &RoaringBitmap) -> RoaringBitmap {
        expected - &self.bitmap
    }

    /// Missing buckets grouped into contiguous inclusive runs.
    pub fn missing_runs(&self, expected: &RoaringBitmap) -> Vec<RangeInclusive<u64>> {
        runs_from_bitmap(&self.missing_points(expected))
    }

    /// `|present ∩ expected| / |expected|`, or `1.0` when nothing is expected.
    pub fn coverage_ratio(&self, expected: &RoaringBitmap) -> f64 {
        let expected_count = expected.len();
        if expected_count == 0 {
            return 1.0;
        }

        let covered = &self.bitmap & expected;
        covered.len() as f64 / expected_count as f64
    }

    /// Length in buckets of the longest missing run (0 if none).
    pub fn max_gap_len(&self, expected: &RoaringBitmap) -> u64 {
        self.missing_runs(expected)
            .into_iter()
            .map(|r| r.end() - r.start() + 1)
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<Bucket> for Coverage {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Bucket>,
    {
        Self {
            bitmap: iter.into_iter().collect(),
        }
    }
}

/// Convert inclusive bucket runs back to the time ranges they span.
pub fn runs_to_ranges(
    spec: &TimeBucket,
    runs: &[RangeInclusive<u64>],
) -> Result<TimeRanges, CoverageError> {
    runs.iter()
        .map(|run| {
            let start = run_bound(spec, *run.start())?;
            let end = run_bound(spec, run.end().saturating_add(1))?;
            Ok(TimeRange::from_ordered(start, end))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(TimeRanges::from)
}

fn run_bound(spec: &TimeBucket, id: u64) -> Result<DateTime<Utc>, CoverageError> {
    i64::try_from(id)
        .ok()
        .and_then(|signed| bucket_start(spec, signed))
        .context(BucketOutOfRangeSnafu { bucket_id: id })
}

fn to_bucket(id: i64) -> Result<Bucket, CoverageError> {
    ensure!(id >= 0, BeforeEpochSnafu { bucket_id: id });
    Bucket::try_from(id).map_err(|_| CoverageError::BucketOverflow { bucket_id: id })
}

fn runs_from_bitmap(bitmap: &RoaringBitmap) -> Vec<RangeInclusive<u64>> {
    let mut out = Vec::new();
    let mut iter = bitmap.iter();

    let Some(mut start) = iter.next() else {
        return out;
    };
    let mut prev = start;

    for v in iter {
        if v == prev + 1 {
            prev = v;
        } else {
            out.push(start as u64..=prev as u64);
            start = v;
            prev = v;
        }
    }

    out.push(start as u64..=prev as u64);
    out
}
