//! Filesystem-backed [`PartitionStore`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rulepay_types::{BlockRange, RuleError};

use super::layout::{DatasetConfig, LatestExport};
use super::{select_partitions, PartitionStore};

/// Reads datasets from local directories.
///
/// Parsed `config.yaml`/`latest.yaml` pairs are memoized for the lifetime
/// of the store, which is one pipeline invocation.
#[derive(Debug, Default)]
pub struct LocalPartitionStore {
    datasets: Mutex<HashMap<PathBuf, (DatasetConfig, LatestExport)>>,
}

impl LocalPartitionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_datasets(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<PathBuf, (DatasetConfig, LatestExport)>>, RuleError> {
        self.datasets
            .lock()
            .map_err(|_| RuleError::execution_msg("partition store", "dataset cache lock poisoned"))
    }

    fn dataset(&self, root: &Path) -> Result<(DatasetConfig, LatestExport), RuleError> {
        let mut datasets = self.lock_datasets()?;
        if let Some(cached) = datasets.get(root) {
            return Ok(cached.clone());
        }
        let loaded = (DatasetConfig::load(root)?, LatestExport::load(root)?);
        tracing::debug!(
            location = %root.display(),
            subgraph = loaded.0.subgraph,
            latest_block = loaded.1.latest_block,
            "Loaded dataset description"
        );
        datasets.insert(root.to_path_buf(), loaded.clone());
        Ok(loaded)
    }
}

/// Map a configured location onto a local directory.
///
/// Plain paths and `file://` URLs are accepted; remote schemes must be
/// mirrored locally by the caller first.
fn local_root(location: &str) -> Result<PathBuf, RuleError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(RuleError::config("dataset location must not be empty"));
    }
    if let Some(path) = trimmed.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = trimmed.split_once("://") {
        return Err(RuleError::config(format!(
            "unsupported storage scheme '{scheme}' in '{trimmed}': use a local path"
        )));
    }
    Ok(PathBuf::from(trimmed))
}

impl PartitionStore for LocalPartitionStore {
    fn partition_files(
        &self,
        locations: &BTreeMap<String, String>,
        table: &str,
        range: BlockRange,
    ) -> Result<Vec<PathBuf>, RuleError> {
        let location = locations.get(table).ok_or_else(|| {
            RuleError::config(format!("no subgraph_config_location for table '{table}'"))
        })?;
        let root = local_root(location)?;
        let (dataset, latest) = self.dataset(&root)?;
        let table_config = dataset.table(table)?;

        let partitions =
            select_partitions(range, latest.latest_block, &table_config.partition_sizes);
        let Some(last) = partitions.last() else {
            return Err(RuleError::execution_msg(
                format!("resolving partitions of '{table}'"),
                format!(
                    "no complete partition covers {range} (latest exported block {})",
                    latest.latest_block
                ),
            ));
        };
        if last.end <= range.max_block {
            tracing::warn!(
                table,
                %range,
                covered_until = last.end,
                latest_block = latest.latest_block,
                "Block range extends beyond the latest complete partition"
            );
        }

        let mut files = Vec::with_capacity(partitions.len());
        for partition in &partitions {
            let path = dataset.partition_path(&root, table, partition);
            let path = std::fs::canonicalize(&path).map_err(|e| {
                RuleError::execution(format!("partition file {}", path.display()), e)
            })?;
            tracing::debug!(table, file = %path.display(), "Resolved partition");
            files.push(path);
        }

        tracing::info!(
            table,
            %range,
            partitions = files.len(),
            "Resolved partition files"
        );
        Ok(files)
    }
}
