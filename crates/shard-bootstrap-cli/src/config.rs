//! JSON description of a bootstrap chain.
//!
//! ```json
//! {
//!   "block_size": "2h",
//!   "retention": "2d",
//!   "bootstrap_concurrency": 4,
//!   "sources": [
//!     { "name": "cache", "kind": "memory", "shards": { "1": { "ranges": [...] } } }
//!   ]
//! }
//! ```
use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use serde::Deserialize;
use snafu::ResultExt;

use shard_bootstrap_core::{
    bootstrapper::BootstrapChain,
    options::{DatabaseOptions, TimeBucket},
    shard_result::ShardId,
    sources::memory::{MemoryShard, MemorySource},
};

use crate::error::{CliResult, InvalidBucketSnafu, ParseConfigSnafu, ReadConfigSnafu};

fn default_block_size() -> String {
    "2h".to_string()
}

fn default_retention() -> String {
    "2d".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(default = "default_block_size")]
    pub block_size: String,

    #[serde(default = "default_retention")]
    pub retention: String,

    #[serde(default)]
    pub bootstrap_concurrency: usize,

    /// Consulted in order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub shards: BTreeMap<ShardId, MemoryShard>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Memory,
}

impl ChainConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        serde_json::from_str(&text).context(ParseConfigSnafu { path })
    }

    pub fn options(&self) -> CliResult<DatabaseOptions> {
        let block_size = parse_bucket("block_size", &self.block_size)?;
        let retention = parse_bucket("retention", &self.retention)?;
        Ok(DatabaseOptions::new()
            .with_block_size(block_size)
            .with_retention_period(retention)
            .with_bootstrap_concurrency(self.bootstrap_concurrency))
    }

    pub fn build_chain(&self, opts: &DatabaseOptions) -> BootstrapChain {
        let mut builder = BootstrapChain::builder(opts.clone());
        for source in &self.sources {
            builder = match source.kind {
                SourceKind::Memory => {
                    let memory = source.shards.iter().fold(
                        MemorySource::new(source.name.clone(), opts.clone()),
                        |acc, (id, shard)| acc.with_shard(*id, shard.clone()),
                    );
                    builder.source(Arc::new(memory))
                }
            };
        }
        builder.build()
    }
}

pub fn parse_bucket(field: &'static str, spec: &str) -> CliResult<TimeBucket> {
    spec.parse::<TimeBucket>()
        .context(InvalidBucketSnafu {
            field,
            spec: spec.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let cfg: ChainConfig = serde_json::from_str(r#"{ "sources": [] }"#).expect("parse");
        let opts = cfg.options().expect("valid buckets");
        assert_eq!(opts, DatabaseOptions::new());
        assert_eq!(cfg.build_chain(&opts).to_string(), "noop");
    }

    #[test]
    fn builds_memory_sources_in_order() {
        let cfg: ChainConfig = serde_json::from_str(
            r#"{
                "block_size": "1h",
                "sources": [
                    { "name": "cache", "kind": "memory" },
                    { "name": "peers", "kind": "memory", "shards": { "4": { "ranges": [] } } }
                ]
            }"#,
        )
        .expect("parse");
        let opts = cfg.options().expect("valid buckets");
        assert_eq!(opts.block_size, TimeBucket::Hours(1));
        assert_eq!(cfg.sources[1].shards.len(), 1);
        assert_eq!(cfg.build_chain(&opts).to_string(), "cache -> peers -> noop");
    }

    #[test]
    fn rejects_bad_bucket() {
        let cfg: ChainConfig =
            serde_json::from_str(r#"{ "retention": "2 fortnights" }"#).expect("parse");
        let err = cfg.options().expect_err("bad unit");
        assert!(err.to_string().contains("Invalid retention"));
    }
}
