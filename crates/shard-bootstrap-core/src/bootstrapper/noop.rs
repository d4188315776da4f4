//! The bootstrapper at the end of every chain.
use std::fmt;

use crate::{shard_result::ShardId, time_range::TimeRanges};

use super::{BootstrapOutcome, Bootstrapper};

const NOOP_BOOTSTRAPPER_NAME: &str = "noop";

/// The terminal bootstrapper: fulfills nothing and returns its input as
/// unfulfilled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpBootstrapper;

impl Bootstrapper for NoOpBootstrapper {
    fn bootstrap(&self, _shard: ShardId, target: &TimeRanges) -> BootstrapOutcome {
        BootstrapOutcome::unfulfilled(target.clone())
    }
}

impl fmt::Display for NoOpBootstrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NOOP_BOOTSTRAPPER_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_range::TimeRange;
    use chrono::{TimeZone, Utc};

    #[test]
    fn returns_input_unchanged() {
        let start = Utc.timestamp_opt(0, 0).single().expect("valid UTC timestamp");
        let end = Utc.timestamp_opt(60, 0).single().expect("valid UTC timestamp");
        let target = TimeRanges::from(TimeRange::new(start, end).expect("valid range"));

        let outcome = NoOpBootstrapper.bootstrap(3, &target);
        assert!(outcome.result.is_none());
        assert_eq!(outcome.unfulfilled, target);

        let empty = NoOpBootstrapper.bootstrap(3, &TimeRanges::new());
        assert!(empty.is_complete());
        assert_eq!(NoOpBootstrapper.to_string(), "noop");
    }
}
