//! Node-wide options shared read-only by every bootstrap chain.
//!
//! [`DatabaseOptions`] is handed to each chain node behind an `Arc` and is
//! never mutated once a chain is built. The chain itself only forwards it to
//! [`ShardResult::new`](crate::shard_result::ShardResult::new); sources and the
//! bootstrap process read the fields they care about.
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    helpers::time_bucket::{align_down, align_up, bucket_len_secs},
    time_range::TimeRange,
};

/// Why a duration string such as `2h` or `30 minutes` was rejected.
///
/// Block sizes, retention periods and coverage granularity are all written
/// this way in configs and on the command line.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ParseTimeBucketError {
    /// Nothing but whitespace was given.
    #[snafu(display("duration is blank"))]
    Empty,

    /// A unit was given without a leading count, e.g. `h`.
    #[snafu(display("duration '{input}' has no count before its unit"))]
    NoCount {
        /// Trimmed input.
        input: String,
    },

    /// A count was given without a unit, e.g. `90`.
    #[snafu(display("duration '{input}' needs a unit: s, m, h or d"))]
    NoUnit {
        /// Trimmed input.
        input: String,
    },

    /// The count is not a whole number that fits in 32 bits.
    #[snafu(display("duration '{input}' has a bad count: {source}"))]
    BadCount {
        /// Trimmed input.
        input: String,
        /// Integer parse failure.
        source: std::num::ParseIntError,
    },

    /// A zero-width duration, e.g. `0m`.
    #[snafu(display("duration '{input}' is zero; blocks and windows need a positive width"))]
    ZeroCount {
        /// Trimmed input.
        input: String,
    },

    /// The unit is not one of seconds, minutes, hours or days.
    #[snafu(display("duration '{input}' uses unknown unit '{unit}'; use s, m, h or d"))]
    UnknownUnit {
        /// Trimmed input.
        input: String,
        /// The unit as written.
        unit: String,
    },
}

/// A fixed-width span of wall-clock time.
///
/// Used for the series block size, the retention period, and the bucket
/// granularity of coverage reports. Buckets of a given width are aligned to
/// the Unix epoch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    /// A span of a fixed number of seconds.
    Seconds(u32),
    /// A span of a fixed number of minutes.
    Minutes(u32),
    /// A span of a fixed number of hours.
    Hours(u32),
    /// A span of a fixed number of days.
    Days(u32),
}

fn unit_ctor(unit: &str) -> Option<fn(u32) -> TimeBucket> {
    let ctor: fn(u32) -> TimeBucket = match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => TimeBucket::Seconds,
        "m" | "min" | "mins" | "minute" | "minutes" => TimeBucket::Minutes,
        "h" | "hr" | "hrs" | "hour" | "hours" => TimeBucket::Hours,
        "d" | "day" | "days" => TimeBucket::Days,
        _ => return None,
    };
    Some(ctor)
}

impl FromStr for TimeBucket {
    type Err = ParseTimeBucketError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        ensure!(!input.is_empty(), EmptySnafu);

        let split = input
            .find(|c: char| c.is_ascii_alphabetic())
            .context(NoUnitSnafu { input })?;
        let (count, unit) = (input[..split].trim(), input[split..].trim());
        ensure!(!count.is_empty(), NoCountSnafu { input });

        let count: u32 = count.parse().context(BadCountSnafu { input })?;
        ensure!(count > 0, ZeroCountSnafu { input });

        let ctor = unit_ctor(unit).context(UnknownUnitSnafu { input, unit })?;
        Ok(ctor(count))
    }
}

impl TimeBucket {
    /// Parse a human-friendly spec (e.g. `2h`, `15m`, `30s`, `7d`).
    ///
    /// # Errors
    /// See [`ParseTimeBucketError`].
    pub fn parse(spec: &str) -> Result<Self, ParseTimeBucketError> {
        spec.parse()
    }

    /// Width of the span.
    pub fn duration(&self) -> Duration {
        Duration::seconds(bucket_len_secs(self))
    }
}

/// Options shared by every chain node and every concurrent unit of a
/// bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Width of the blocks series data is grouped into.
    pub block_size: TimeBucket,

    /// How far back from "now" a node keeps data.
    pub retention_period: TimeBucket,

    /// Maximum number of shards bootstrapped at once by
    /// [`BootstrapProcess`](crate::process::BootstrapProcess).
    ///
    /// `0` means one per logical CPU.
    #[serde(default)]
    pub bootstrap_concurrency: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            block_size: TimeBucket::Hours(2),
            retention_period: TimeBucket::Days(2),
            bootstrap_concurrency: 0,
        }
    }
}

impl DatabaseOptions {
    /// Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the block size.
    pub fn with_block_size(mut self, block_size: TimeBucket) -> Self {
        self.block_size = block_size;
        self
    }

    /// Replace the retention period.
    pub fn with_retention_period(mut self, retention_period: TimeBucket) -> Self {
        self.retention_period = retention_period;
        self
    }

    /// Replace the shard-level bootstrap concurrency.
    pub fn with_bootstrap_concurrency(mut self, concurrency: usize) -> Self {
        self.bootstrap_concurrency = concurrency;
        self
    }

    /// The range a node is expected to hold at `now`:
    /// `[now - retention, now)`, widened outward to block boundaries.
    ///
    /// Timestamps before the Unix epoch are clamped to the epoch.
    pub fn retention_window(&self, now: DateTime<Utc>) -> TimeRange {
        let now = now.max(DateTime::<Utc>::UNIX_EPOCH);
        let earliest = now
            .checked_sub_signed(self.retention_period.duration())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
            .max(DateTime::<Utc>::UNIX_EPOCH);

        let start = align_down(&self.block_size, earliest);
        let end = align_up(&self.block_size, now);
        TimeRange::from_ordered(start, end.max(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid UTC timestamp")
    }

    #[test]
    fn time_bucket_parse_accepts_basic_units() {
        let cases = [
            ("1s", TimeBucket::Seconds(1)),
            ("2m", TimeBucket::Minutes(2)),
            ("3h", TimeBucket::Hours(3)),
            ("4d", TimeBucket::Days(4)),
            ("  2 hours ", TimeBucket::Hours(2)),
            ("1MiN", TimeBucket::Minutes(1)),
        ];

        for (input, expected) in cases {
            assert_eq!(input.parse::<TimeBucket>().unwrap(), expected);
        }
    }

    #[test]
    fn time_bucket_parse_rejects_bad_specs() {
        assert_eq!(TimeBucket::parse("  "), Err(ParseTimeBucketError::Empty));
        assert!(matches!(
            TimeBucket::parse("h"),
            Err(ParseTimeBucketError::NoCount { .. })
        ));
        assert!(matches!(
            TimeBucket::parse("42"),
            Err(ParseTimeBucketError::NoUnit { .. })
        ));
        assert!(matches!(
            TimeBucket::parse("1.5h"),
            Err(ParseTimeBucketError::BadCount { .. })
        ));
        assert_eq!(
            TimeBucket::parse(" 0m "),
            Err(ParseTimeBucketError::ZeroCount {
                input: "0m".to_string()
            })
        );
        assert!(matches!(
            TimeBucket::parse("1w"),
            Err(ParseTimeBucketError::UnknownUnit { unit, .. }) if unit == "w"
        ));

        let overflow = format!("{}h", u64::from(u32::MAX) + 1);
        assert!(matches!(
            TimeBucket::parse(&overflow),
            Err(ParseTimeBucketError::BadCount { .. })
        ));
    }

    #[test]
    fn time_bucket_duration() {
        assert_eq!(TimeBucket::Seconds(30).duration(), Duration::seconds(30));
        assert_eq!(TimeBucket::Minutes(15).duration(), Duration::minutes(15));
        assert_eq!(TimeBucket::Hours(2).duration(), Duration::hours(2));
        assert_eq!(TimeBucket::Days(1).duration(), Duration::days(1));
    }

    #[test]
    fn retention_window_aligns_outward_to_blocks() {
        let opts = DatabaseOptions::new()
            .with_block_size(TimeBucket::Hours(2))
            .with_retention_period(TimeBucket::Hours(6));

        let now = utc(2024, 3, 1, 13, 30, 0);
        let window = opts.retention_window(now);

        assert_eq!(window.start(), utc(2024, 3, 1, 6, 0, 0));
        assert_eq!(window.end(), utc(2024, 3, 1, 14, 0, 0));
    }

    #[test]
    fn retention_window_on_block_boundary_is_exact() {
        let opts = DatabaseOptions::new()
            .with_block_size(TimeBucket::Hours(1))
            .with_retention_period(TimeBucket::Hours(3));

        let now = utc(2024, 3, 1, 12, 0, 0);
        let window = opts.retention_window(now);

        assert_eq!(window.start(), utc(2024, 3, 1, 9, 0, 0));
        assert_eq!(window.end(), now);
    }

    #[test]
    fn retention_window_clamps_to_epoch() {
        let opts = DatabaseOptions::new().with_retention_period(TimeBucket::Days(365));
        let window = opts.retention_window(utc(1970, 1, 2, 0, 0, 0));
        assert_eq!(window.start(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn options_json_defaults_concurrency() {
        let json = r#"{ "block_size": { "Hours": 2 }, "retention_period": { "Days": 2 } }"#;
        let opts: DatabaseOptions = serde_json::from_str(json).expect("deserialize");
        assert_eq!(opts, DatabaseOptions::default());
    }
}
