//! # shard-bootstrap
//!
//! Chained, concurrent bootstrapping of time-series shards.
//!
//! This crate is the supported public entry point and provides a small, stable surface.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use shard_bootstrap::prelude::*;
//!
//! let opts = DatabaseOptions::new();
//! let cache = MemorySource::new("cache", opts.clone());
//! let chain = BootstrapChain::builder(opts)
//!     .source(Arc::new(cache))
//!     .build();
//!
//! assert_eq!(chain.to_string(), "cache -> noop");
//! let outcome = chain.bootstrap(1, &TimeRanges::new());
//! assert!(outcome.is_complete());
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Coverage namespace (wrapper-only).
pub mod coverage {
    pub use shard_bootstrap_core::coverage::{Bucket, Coverage, CoverageError};
}

/// Built-in sources.
pub mod sources {
    pub use shard_bootstrap_core::sources::memory::{MemoryShard, MemorySource};
}

pub use shard_bootstrap_core::bootstrapper::{
    BootstrapChain, BootstrapChainBuilder, BootstrapOutcome, Bootstrapper, ChainNode,
    NoOpBootstrapper,
};
pub use shard_bootstrap_core::options::{DatabaseOptions, ParseTimeBucketError, TimeBucket};
pub use shard_bootstrap_core::process::{BootstrapProcess, ProcessError};
pub use shard_bootstrap_core::report::ShardReport;
pub use shard_bootstrap_core::shard_result::{
    Block, Datapoint, SeriesBlocks, SeriesId, ShardId, ShardResult,
};
pub use shard_bootstrap_core::source::Source;
pub use shard_bootstrap_core::time_range::{TimeRange, TimeRangeError, TimeRanges};
