//! A source backed by series data held in memory.
//!
//! Useful as a cache tier in front of slower sources, for wiring up chains
//! from a config file, and in tests. Each shard may carry ranges it
//! advertises but cannot deliver, which models evicted or corrupt blocks.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    bootstrapper::BootstrapOutcome,
    options::DatabaseOptions,
    shard_result::{Datapoint, SeriesId, ShardId, ShardResult},
    source::Source,
    time_range::TimeRanges,
};

/// Data held for one shard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryShard {
    /// Ranges this shard advertises.
    pub ranges: TimeRanges,
    /// Datapoints per series.
    #[serde(default)]
    pub series: BTreeMap<SeriesId, Vec<Datapoint>>,
    /// Advertised ranges whose data cannot be delivered.
    #[serde(default)]
    pub undeliverable: TimeRanges,
}

impl MemoryShard {
    /// A shard advertising `ranges` with no datapoints yet.
    pub fn new(ranges: TimeRanges) -> Self {
        Self {
            ranges,
            ..Self::default()
        }
    }

    /// Add a datapoint to `id`.
    pub fn with_datapoint(mut self, id: SeriesId, point: Datapoint) -> Self {
        self.series.entry(id).or_default().push(point);
        self
    }

    /// Mark `ranges` as advertised but undeliverable.
    pub fn with_undeliverable(mut self, ranges: TimeRanges) -> Self {
        self.undeliverable = self.undeliverable.add_ranges(&ranges);
        self
    }
}

/// An immutable, named set of in-memory shards.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    opts: Arc<DatabaseOptions>,
    shards: HashMap<ShardId, MemoryShard>,
}

impl MemorySource {
    /// A source named `name` holding nothing.
    pub fn new(name: impl Into<String>, opts: DatabaseOptions) -> Self {
        Self {
            name: name.into(),
            opts: Arc::new(opts),
            shards: HashMap::new(),
        }
    }

    /// Hold `data` for `shard`, replacing anything held before.
    pub fn with_shard(mut self, shard: ShardId, data: MemoryShard) -> Self {
        self.shards.insert(shard, data);
        self
    }

    /// Data held for `shard`.
    pub fn shard(&self, shard: ShardId) -> Option<&MemoryShard> {
        self.shards.get(&shard)
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn availability(&self, shard: ShardId, requested: &TimeRanges) -> TimeRanges {
        match self.shards.get(&shard) {
            Some(data) => requested.intersect(&data.ranges),
            None => TimeRanges::new(),
        }
    }

    fn read(&self, shard: ShardId, available: &TimeRanges) -> BootstrapOutcome {
        let Some(data) = self.shards.get(&shard) else {
            return BootstrapOutcome::unfulfilled(available.clone());
        };

        let deliverable = available.remove_ranges(&data.undeliverable);
        let mut result = ShardResult::new(&self.opts);
        for (id, points) in &data.series {
            for point in points.iter().filter(|p| deliverable.contains(p.timestamp)) {
                result.add_datapoint(id.clone(), *point);
            }
        }

        debug!(
            "source {}: shard {shard} read {} datapoint(s) from [{deliverable}]",
            self.name,
            result.num_datapoints()
        );
        BootstrapOutcome::new(Some(result), available.intersect(&data.undeliverable))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::time_range::TimeRange;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0)
            .single()
            .expect("valid UTC timestamp")
    }

    fn window(a: u32, b: u32) -> TimeRanges {
        TimeRanges::from(TimeRange::new(at(a), at(b)).expect("valid range"))
    }

    fn source() -> MemorySource {
        let shard = MemoryShard::new(window(0, 6))
            .with_datapoint("cpu".into(), Datapoint::new(at(1), 1.0))
            .with_datapoint("cpu".into(), Datapoint::new(at(4), 4.0))
            .with_datapoint("mem".into(), Datapoint::new(at(5), 5.0))
            .with_undeliverable(window(4, 5));
        MemorySource::new("cache", DatabaseOptions::new()).with_shard(1, shard)
    }

    #[test]
    fn availability_is_intersection_with_held_ranges() {
        let src = source();
        assert_eq!(src.availability(1, &window(3, 9)), window(3, 6));
        assert!(src.availability(2, &window(0, 6)).is_empty());
    }

    #[test]
    fn read_skips_undeliverable_ranges() {
        let outcome = source().read(1, &window(0, 6));

        assert_eq!(outcome.unfulfilled, window(4, 5));
        let result = outcome.result.expect("result present");
        assert_eq!(result.num_datapoints(), 2);
        let cpu: Vec<f64> = result
            .get(&"cpu".into())
            .expect("cpu present")
            .datapoints()
            .map(|p| p.value)
            .collect();
        assert_eq!(cpu, vec![1.0]);
    }

    #[test]
    fn read_only_returns_points_in_request() {
        let outcome = source().read(1, &window(0, 2));
        assert!(outcome.is_complete());
        assert_eq!(outcome.result.map(|r| r.num_datapoints()), Some(1));
    }

    #[test]
    fn shard_deserializes_from_json() -> Result<(), serde_json::Error> {
        let json = r#"{
            "ranges": [{"start": "2024-05-01T00:00:00Z", "end": "2024-05-01T06:00:00Z"}],
            "series": {"cpu": [{"timestamp": "2024-05-01T01:00:00Z", "value": 2.5}]}
        }"#;
        let shard: MemoryShard = serde_json::from_str(json)?;
        assert_eq!(shard.ranges, window(0, 6));
        assert!(shard.undeliverable.is_empty());
        assert_eq!(shard.series[&SeriesId::from("cpu")].len(), 1);
        Ok(())
    }
}
