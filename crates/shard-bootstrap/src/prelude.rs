//! Wrapper prelude.
//!
//! The `shard-bootstrap` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::coverage;
pub use crate::sources::{MemoryShard, MemorySource};
pub use crate::{
    BootstrapChain, BootstrapOutcome, BootstrapProcess, Bootstrapper, DatabaseOptions, Datapoint,
    SeriesId, ShardId, ShardReport, ShardResult, Source, TimeBucket, TimeRange, TimeRanges,
};
