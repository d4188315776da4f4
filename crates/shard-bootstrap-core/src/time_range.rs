//! Half-open time ranges and normalized sets of them.
//!
//! A [`TimeRange`] is the interval `[start, end)` over wall-clock UTC time.
//! A [`TimeRanges`] value is an ordered set of ranges kept in normal form:
//!
//! - ranges are sorted by start,
//! - no two ranges overlap or touch (adjacent ranges are coalesced),
//! - a set with zero ranges is the distinguished empty set.
//!
//! All set operations take `&self` and return a fresh value, so a caller can
//! keep holding a request while deriving availability or remainders from it.
//!
//! Zero-duration ranges (`start == end`) are valid. They are kept as markers
//! in a set unless they fall within the closed hull `[start, end]` of a
//! positive range, in which case they coalesce into it. A positive range
//! removes every marker inside its closed hull; removing a zero-duration
//! range only removes an identical marker.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Errors produced when constructing a [`TimeRange`].
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TimeRangeError {
    /// The range end precedes its start.
    #[snafu(display("Invalid time range: start={start}, end={end} (expect start <= end)"))]
    InvalidRange {
        /// Inclusive lower bound supplied by the caller.
        start: DateTime<Utc>,
        /// Exclusive upper bound supplied by the caller.
        end: DateTime<Utc>,
    },
}

/// A half-open interval `[start, end)` of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    /// Create the range `[start, end)`.
    ///
    /// Returns [`TimeRangeError::InvalidRange`] if `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        ensure!(start <= end, InvalidRangeSnafu { start, end });
        Ok(Self { start, end })
    }

    /// Build a range from bounds the caller already knows are ordered.
    pub(crate) fn from_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start <= end, "from_ordered: start={start:?} > end={end:?}");
        Self { start, end }
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True if `start == end`.
    pub fn is_zero_duration(&self) -> bool {
        self.start == self.end
    }

    /// True if `ts` lies inside `[start, end)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// True if the two ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if the closed hulls of the two ranges intersect
    /// (overlap or adjacency).
    fn touches(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    fn hull(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// A normalized, immutable-by-API set of [`TimeRange`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TimeRange>", into = "Vec<TimeRange>")]
pub struct TimeRanges {
    ranges: Vec<TimeRange>,
}

impl TimeRanges {
    /// The empty set.
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// True iff the set holds zero ranges.
    ///
    /// A set holding only a zero-duration range is *not* empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of disjoint ranges in the set.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Iterate the ranges in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, TimeRange> {
        self.ranges.iter()
    }

    /// Sum of the durations of all ranges.
    pub fn total_duration(&self) -> Duration {
        self.ranges
            .iter()
            .fold(Duration::zero(), |acc, r| acc + r.duration())
    }

    /// True if `ts` falls inside one of the ranges.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        // First range whose end is beyond `ts` is the only candidate.
        let idx = self.ranges.partition_point(|r| r.end <= ts);
        self.ranges.get(idx).is_some_and(|r| r.contains(ts))
    }

    /// Return `self ∪ {range}`.
    pub fn add_range(&self, range: TimeRange) -> TimeRanges {
        let mut out = self.clone();
        out.insert(range);
        out
    }

    /// Return `self ∪ other`.
    pub fn add_ranges(&self, other: &TimeRanges) -> TimeRanges {
        let mut out = self.clone();
        for range in &other.ranges {
            out.insert(*range);
        }
        out
    }

    /// Return `self - {range}`.
    pub fn remove_range(&self, range: TimeRange) -> TimeRanges {
        let mut out = self.clone();
        out.subtract(&range);
        out
    }

    /// Return the part of `self` not covered by `other`.
    pub fn remove_ranges(&self, other: &TimeRanges) -> TimeRanges {
        let mut out = self.clone();
        for range in &other.ranges {
            if out.is_empty() {
                break;
            }
            out.subtract(range);
        }
        out
    }

    /// Return `self ∩ other`.
    pub fn intersect(&self, other: &TimeRanges) -> TimeRanges {
        self.remove_ranges(&self.remove_ranges(other))
    }

    /// True if every range of `self` is covered by `other`.
    pub fn is_subset_of(&self, other: &TimeRanges) -> bool {
        self.remove_ranges(other).is_empty()
    }

    /// True if the two sets share anything.
    pub fn overlaps(&self, other: &TimeRanges) -> bool {
        !self.intersect(other).is_empty()
    }

    fn insert(&mut self, range: TimeRange) {
        let mut merged = range;
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut after = Vec::new();

        for existing in self.ranges.drain(..) {
            if existing.end < merged.start {
                out.push(existing);
            } else if existing.start > merged.end {
                after.push(existing);
            } else {
                merged = merged.hull(&existing);
            }
        }

        out.push(merged);
        out.extend(after);
        self.ranges = out;
    }

    fn subtract(&mut self, range: &TimeRange) {
        if range.is_zero_duration() {
            self.ranges.retain(|existing| existing != range);
            return;
        }

        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        for existing in self.ranges.drain(..) {
            if existing.is_zero_duration() {
                if !existing.touches(range) {
                    out.push(existing);
                }
                continue;
            }

            if !existing.overlaps(range) {
                out.push(existing);
                continue;
            }

            if existing.start < range.start {
                out.push(TimeRange {
                    start: existing.start,
                    end: range.start,
                });
            }
            if range.end < existing.end {
                out.push(TimeRange {
                    start: range.end,
                    end: existing.end,
                });
            }
        }
        self.ranges = out;
    }
}

impl From<TimeRange> for TimeRanges {
    fn from(range: TimeRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }
}

impl From<Vec<TimeRange>> for TimeRanges {
    fn from(ranges: Vec<TimeRange>) -> Self {
        ranges.into_iter().collect()
    }
}

impl From<TimeRanges> for Vec<TimeRange> {
    fn from(ranges: TimeRanges) -> Self {
        ranges.ranges
    }
}

impl FromIterator<TimeRange> for TimeRanges {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TimeRange>,
    {
        let mut out = TimeRanges::new();
        for range in iter {
            out.insert(range);
        }
        out
    }
}

impl<'a> IntoIterator for &'a TimeRanges {
    type Item = &'a TimeRange;
    type IntoIter = std::slice::Iter<'a, TimeRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl fmt::Display for TimeRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return f.write_str("none");
        }
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
