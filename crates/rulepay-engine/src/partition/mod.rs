//! Resolution of block-partitioned datasets into concrete partition files.
//!
//! A dataset location holds a `config.yaml` describing its tables and the
//! partition sizes they are exported at, a `latest.yaml` with the highest
//! exported block, and one parquet file per complete partition:
//!
//! ```text
//! <location>/data/subgraph=<id>/table=<table>/partition_size=<s>/start_partition=<a>/end_partition=<b>/data.parquet
//! ```

mod layout;
mod local;

use std::collections::BTreeMap;
use std::path::PathBuf;

use rulepay_types::{BlockRange, RuleError};

pub use layout::{DatasetConfig, LatestExport, TableConfig};
pub use local::LocalPartitionStore;

/// Data access collaborator: maps a table and block range to partition files.
///
/// The core treats implementations as read-only. Any caching of remote
/// data belongs to the implementation.
pub trait PartitionStore: Send + Sync {
    /// Files covering `range` for `table`, in partition order.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] when `table` has no entry in
    /// `locations` or its dataset is misconfigured, and
    /// [`RuleError::Execution`] when the storage cannot be read.
    fn partition_files(
        &self,
        locations: &BTreeMap<String, String>,
        table: &str,
        range: BlockRange,
    ) -> Result<Vec<PathBuf>, RuleError>;
}

/// One complete partition `[start, end)` exported at `size` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub size: u64,
    pub start: u64,
    pub end: u64,
}

/// Complete partitions covering `min_block..latest_block`, largest sizes first.
///
/// For each size (descending) partitions run up to `latest_block` rounded
/// down to the size. The first size that emits anything starts at
/// `min_block` rounded down; every smaller size resumes where the last
/// emitted partition ended and never starts below it, so no block is
/// covered twice. Sizes are expected to nest (see [`DatasetConfig::table`]),
/// otherwise blocks between a coarse end and the next fine boundary are
/// left uncovered.
#[must_use]
pub fn complete_partitions(min_block: u64, latest_block: u64, sizes: &[u64]) -> Vec<Partition> {
    let mut sizes: Vec<u64> = sizes.iter().copied().filter(|s| *s > 0).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes.dedup();

    let mut lower = min_block;
    let mut partitions: Vec<Partition> = Vec::new();
    for size in sizes {
        let mut start = if partitions.is_empty() {
            (lower / size) * size
        } else {
            lower.div_ceil(size) * size
        };
        let end_allowed = (latest_block / size) * size;
        while start < end_allowed {
            partitions.push(Partition {
                size,
                start,
                end: start + size,
            });
            start += size;
        }
        if let Some(last) = partitions.last() {
            lower = last.end;
        }
    }
    partitions
}

/// Partitions that overlap `range`, given the dataset's latest exported block.
#[must_use]
pub fn select_partitions(range: BlockRange, latest_block: u64, sizes: &[u64]) -> Vec<Partition> {
    complete_partitions(range.min_block, latest_block, sizes)
        .into_iter()
        .filter(|p| p.start <= range.max_block)
        .collect()
}
