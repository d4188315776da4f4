//! Helpers for mapping timestamps onto epoch-aligned buckets.
//!
//! These helpers define one stable mapping shared by block alignment and
//! coverage reporting:
//!
//! - Bucket ids are signed `i64`, counted from the Unix epoch
//!   (1970-01-01T00:00:00Z); pre-epoch instants get negative ids.
//! - The bucket width is determined by [`TimeBucket`].
//! - `bucket_id` is monotonic in time: later timestamps never map to
//!   a smaller bucket id than earlier timestamps.
//! - `bucket_range` works on half-open [`TimeRange`]s and returns an
//!   *inclusive* range of bucket ids that intersect that interval.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};

use crate::{options::TimeBucket, time_range::TimeRange};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Return the bucket width in whole seconds.
pub(crate) fn bucket_len_secs(spec: &TimeBucket) -> i64 {
    match *spec {
        TimeBucket::Seconds(n) => n as i64,
        TimeBucket::Minutes(n) => (n as i64) * SECONDS_PER_MINUTE,
        TimeBucket::Hours(n) => (n as i64) * SECONDS_PER_HOUR,
        TimeBucket::Days(n) => (n as i64) * SECONDS_PER_DAY,
    }
}

/// Map a timestamp to its bucket id: `floor((ts - epoch) / len)`.
pub fn bucket_id(spec: &TimeBucket, ts: DateTime<Utc>) -> i64 {
    let len_secs = bucket_len_secs(spec);
    debug_assert!(len_secs > 0, "TimeBucket width must be positive");

    ts.timestamp().div_euclid(len_secs)
}

/// Return the timestamp at which bucket `id` starts, or `None` if it is not
/// representable.
pub fn bucket_start(spec: &TimeBucket, id: i64) -> Option<DateTime<Utc>> {
    let secs = id.checked_mul(bucket_len_secs(spec))?;
    DateTime::from_timestamp(secs, 0)
}

/// Return the *inclusive* range of bucket ids intersecting `range`.
///
/// Returns `None` for a zero-duration range, which covers no instant.
///
/// Example (1-minute buckets):
///
/// - `[10:00:10, 10:03:00)` covers the 10:00, 10:01 and 10:02 buckets.
/// - The bucket starting at 10:03 is *not* included.
pub fn bucket_range(spec: &TimeBucket, range: &TimeRange) -> Option<RangeInclusive<i64>> {
    if range.is_zero_duration() {
        return None;
    }

    let first = bucket_id(spec, range.start());
    // Shift the exclusive end back by 1ns so it lands in the last bucket
    // still intersecting the range.
    let last = bucket_id(spec, range.end() - Duration::nanoseconds(1));
    Some(first..=last)
}

/// Round `ts` down to the start of its bucket.
pub fn align_down(spec: &TimeBucket, ts: DateTime<Utc>) -> DateTime<Utc> {
    bucket_start(spec, bucket_id(spec, ts)).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Round `ts` up to the next bucket boundary (unchanged if already on one).
pub fn align_up(spec: &TimeBucket, ts: DateTime<Utc>) -> DateTime<Utc> {
    let down = align_down(spec, ts);
    if down >= ts {
        return down;
    }
    down.checked_add_signed(spec.duration())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
