//! Per-shard accumulation of recovered series data.
//!
//! A [`ShardResult`] is created fresh for every bootstrap invocation and is
//! exclusively owned by that invocation until it is returned. Data is grouped
//! per series into blocks aligned to [`DatabaseOptions::block_size`]; merging
//! two results unions their series, blocks, and datapoints.
use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    helpers::time_bucket::align_down,
    options::{DatabaseOptions, TimeBucket},
};

/// Identifier of a logical partition of the keyspace.
pub type ShardId = u32;

/// Identity of one time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub String);

impl From<&str> for SeriesId {
    fn from(id: &str) -> Self {
        SeriesId(id.to_string())
    }
}

impl From<String> for SeriesId {
    fn from(id: String) -> Self {
        SeriesId(id)
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single timestamped sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    pub value: f64,
}

impl Datapoint {
    /// Build a datapoint.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// The datapoints of one series falling inside one block window.
///
/// Points are kept sorted by timestamp with at most one point per timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    start: DateTime<Utc>,
    points: Vec<Datapoint>,
}

impl Block {
    /// An empty block starting at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            points: Vec::new(),
        }
    }

    /// Start of the block window.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Points in ascending timestamp order.
    pub fn points(&self) -> &[Datapoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the block holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Insert a point; a point already stored at the same timestamp is
    /// replaced.
    pub fn insert(&mut self, point: Datapoint) {
        match self
            .points
            .binary_search_by(|p| p.timestamp.cmp(&point.timestamp))
        {
            Ok(idx) => self.points[idx] = point,
            Err(idx) => self.points.insert(idx, point),
        }
    }

    /// Fold every point of `other` into this block.
    pub fn merge(&mut self, other: Block) {
        if self.points.is_empty() {
            self.points = other.points;
            return;
        }
        for point in other.points {
            self.insert(point);
        }
    }
}

/// All blocks recovered for one series, keyed by block start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesBlocks {
    blocks: BTreeMap<DateTime<Utc>, Block>,
}

impl SeriesBlocks {
    /// No blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block, merging with any block already stored at the same start.
    pub fn add_block(&mut self, block: Block) {
        match self.blocks.get_mut(&block.start) {
            Some(existing) => existing.merge(block),
            None => {
                self.blocks.insert(block.start, block);
            }
        }
    }

    /// Merge every block of `other` into `self`.
    pub fn merge(&mut self, other: SeriesBlocks) {
        for block in other.blocks.into_values() {
            self.add_block(block);
        }
    }

    /// Block starting at `start`, if any.
    pub fn block(&self, start: DateTime<Utc>) -> Option<&Block> {
        self.blocks.get(&start)
    }

    /// Blocks in ascending start order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if no block is stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of points across blocks.
    pub fn num_datapoints(&self) -> usize {
        self.blocks.values().map(Block::len).sum()
    }

    /// All points in ascending timestamp order.
    pub fn datapoints(&self) -> impl Iterator<Item = &Datapoint> {
        self.blocks.values().flat_map(|b| b.points.iter())
    }
}

/// Series data recovered for a single shard during one bootstrap call.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardResult {
    block_size: TimeBucket,
    series: BTreeMap<SeriesId, SeriesBlocks>,
}

impl ShardResult {
    /// An empty result whose block layout follows `opts`.
    pub fn new(opts: &DatabaseOptions) -> Self {
        Self {
            block_size: opts.block_size,
            series: BTreeMap::new(),
        }
    }

    /// Add one point to `id`, placing it in its block.
    pub fn add_datapoint(&mut self, id: SeriesId, point: Datapoint) {
        let start = align_down(&self.block_size, point.timestamp);
        let blocks = self.series.entry(id).or_default();
        match blocks.blocks.get_mut(&start) {
            Some(block) => block.insert(point),
            None => {
                let mut block = Block::new(start);
                block.insert(point);
                blocks.blocks.insert(start, block);
            }
        }
    }

    /// Add a full set of blocks to `id`, combining with data already held.
    pub fn add_series(&mut self, id: SeriesId, blocks: SeriesBlocks) {
        match self.series.get_mut(&id) {
            Some(existing) => existing.merge(blocks),
            None => {
                self.series.insert(id, blocks);
            }
        }
    }

    /// Merge all series of `other` into `self`.
    ///
    /// Series present in both are combined block by block; on an identical
    /// timestamp the point from `other` wins.
    pub fn add_result(&mut self, other: ShardResult) {
        if self.series.is_empty() {
            self.series = other.series;
            return;
        }
        for (id, blocks) in other.series {
            self.add_series(id, blocks);
        }
    }

    /// Blocks recovered for `id`.
    pub fn get(&self, id: &SeriesId) -> Option<&SeriesBlocks> {
        self.series.get(id)
    }

    /// All recovered series in id order.
    pub fn series(&self) -> &BTreeMap<SeriesId, SeriesBlocks> {
        &self.series
    }

    /// Consume the result, returning the per-series data.
    pub fn into_series(self) -> BTreeMap<SeriesId, SeriesBlocks> {
        self.series
    }

    /// Number of distinct series.
    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    /// Total number of points across all series.
    pub fn num_datapoints(&self) -> usize {
        self.series.values().map(SeriesBlocks::num_datapoints).sum()
    }

    /// True if no series was recovered.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opts() -> DatabaseOptions {
        DatabaseOptions::new().with_block_size(TimeBucket::Hours(1))
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0)
            .single()
            .expect("valid UTC timestamp")
    }

    fn series_ids(result: &ShardResult) -> Vec<String> {
        result.series().keys().map(|id| id.0.clone()).collect()
    }

    #[test]
    fn datapoints_land_in_aligned_blocks() {
        let mut result = ShardResult::new(&opts());
        result.add_datapoint("cpu".into(), Datapoint::new(at(10, 45), 1.0));
        result.add_datapoint("cpu".into(), Datapoint::new(at(10, 5), 2.0));
        result.add_datapoint("cpu".into(), Datapoint::new(at(11, 0), 3.0));

        let blocks = result.get(&"cpu".into()).expect("series present");
        assert_eq!(blocks.len(), 2);

        let first = blocks.block(at(10, 0)).expect("10:00 block");
        let stamps: Vec<_> = first.points().iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![at(10, 5), at(10, 45)]);
        assert_eq!(blocks.block(at(11, 0)).map(Block::len), Some(1));
        assert_eq!(result.num_datapoints(), 3);
    }

    #[test]
    fn add_result_combines_duplicate_series() {
        let mut a = ShardResult::new(&opts());
        a.add_datapoint("cpu".into(), Datapoint::new(at(10, 0), 1.0));
        a.add_datapoint("mem".into(), Datapoint::new(at(10, 0), 5.0));

        let mut b = ShardResult::new(&opts());
        b.add_datapoint("cpu".into(), Datapoint::new(at(10, 30), 2.0));
        b.add_datapoint("disk".into(), Datapoint::new(at(12, 0), 7.0));

        a.add_result(b);

        assert_eq!(series_ids(&a), vec!["cpu", "disk", "mem"]);
        let cpu = a.get(&"cpu".into()).expect("cpu present");
        assert_eq!(cpu.num_datapoints(), 2);
    }

    #[test]
    fn identical_timestamp_takes_incoming_value() {
        let mut a = ShardResult::new(&opts());
        a.add_datapoint("cpu".into(), Datapoint::new(at(10, 0), 1.0));

        let mut b = ShardResult::new(&opts());
        b.add_datapoint("cpu".into(), Datapoint::new(at(10, 0), 9.0));

        a.add_result(b);
        let values: Vec<f64> = a
            .get(&"cpu".into())
            .expect("cpu present")
            .datapoints()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![9.0]);
    }

    #[test]
    fn merge_order_does_not_change_series_set() {
        let build = |ids: &[&str]| {
            let mut r = ShardResult::new(&opts());
            for (i, id) in ids.iter().enumerate() {
                r.add_datapoint((*id).into(), Datapoint::new(at(10, i as u32), i as f64));
            }
            r
        };

        let mut ab = build(&["a", "b"]);
        ab.add_result(build(&["b", "c"]));

        let mut ba = build(&["b", "c"]);
        ba.add_result(build(&["a", "b"]));

        assert_eq!(series_ids(&ab), series_ids(&ba));
        assert_eq!(ab.num_datapoints(), ba.num_datapoints());
    }

    #[test]
    fn merging_into_empty_takes_other_wholesale() {
        let mut empty = ShardResult::new(&opts());
        let mut other = ShardResult::new(&opts());
        other.add_datapoint("cpu".into(), Datapoint::new(at(10, 0), 1.0));

        empty.add_result(other.clone());
        assert_eq!(empty, other);
    }

    #[test]
    fn pre_epoch_datapoint_lands_in_its_own_block() {
        let point_at = Utc
            .with_ymd_and_hms(1969, 12, 31, 23, 15, 0)
            .single()
            .expect("valid UTC timestamp");
        let mut result = ShardResult::new(&opts());
        result.add_datapoint("cpu".into(), Datapoint::new(point_at, 1.0));

        let blocks = result.get(&"cpu".into()).expect("cpu present");
        let block = blocks.blocks().next().expect("one block");
        assert!(block.start() <= point_at);
        assert_eq!(
            block.start(),
            Utc.with_ymd_and_hms(1969, 12, 31, 23, 0, 0)
                .single()
                .expect("valid UTC timestamp")
        );
    }

    #[test]
    fn series_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SeriesId::from("cpu.user")).expect("serialize");
        assert_eq!(json, r#""cpu.user""#);
    }
}
