use std::path::PathBuf;

use shard_bootstrap_core::{
    coverage::CoverageError, options::ParseTimeBucketError, process::ProcessError,
    time_range::TimeRangeError,
};
use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Failed to read config file: {}", path.display()))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid config file {}: {source}", path.display()))]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Invalid {field} '{spec}': {source}"))]
    InvalidBucket {
        field: &'static str,
        spec: String,
        source: ParseTimeBucketError,
    },

    #[snafu(display("Invalid {flag} '{value}': expected an RFC 3339 timestamp ({source})"))]
    InvalidTimestamp {
        flag: &'static str,
        value: String,
        source: chrono::ParseError,
    },

    #[snafu(display("--start and --end must be given together"))]
    PartialWindow,

    #[snafu(display("Invalid bootstrap window: {source}"))]
    InvalidWindow { source: TimeRangeError },

    #[snafu(display("Bootstrap failed: {source}"))]
    Process { source: ProcessError },

    #[snafu(display("Failed to compute coverage for shard {shard}: {source}"))]
    Report {
        shard: u32,
        source: CoverageError,
    },

    #[snafu(display("Failed to serialize report: {source}"))]
    SerializeReport { source: serde_json::Error },

    #[snafu(display("Bootstrap left unfulfilled ranges for shard(s): {shards}"))]
    Incomplete { shards: String },
}
