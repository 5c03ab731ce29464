//! On-disk description of an exported, block-partitioned dataset.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rulepay_types::RuleError;
use serde::{Deserialize, Serialize};

use super::Partition;

const CONFIG_FILE: &str = "config.yaml";
const LATEST_FILE: &str = "latest.yaml";
const PARTITION_FILE: &str = "data.parquet";

/// Contents of `<location>/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Identifier of the indexed subgraph the data was exported from.
    pub subgraph: String,
    pub tables: BTreeMap<String, TableConfig>,
}

/// Export settings of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub partition_sizes: Vec<u64>,
}

/// Contents of `<location>/latest.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestExport {
    pub latest_block: u64,
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RuleError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RuleError::execution(format!("failed to read {}", path.display()), e))?;
    serde_yaml::from_str(&content)
        .map_err(|e| RuleError::config(format!("invalid dataset file {}: {e}", path.display())))
}

impl DatasetConfig {
    /// Load `config.yaml` from a dataset root.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the file can't be read and
    /// [`RuleError::Configuration`] if it is malformed.
    pub fn load(root: &Path) -> Result<Self, RuleError> {
        read_yaml(&root.join(CONFIG_FILE))
    }

    /// Export settings of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] if the dataset does not export
    /// `table`, exports it without any usable partition size, or its sizes
    /// do not nest (every size must divide the next larger one).
    pub fn table(&self, table: &str) -> Result<&TableConfig, RuleError> {
        let config = self.tables.get(table).ok_or_else(|| {
            RuleError::config(format!(
                "dataset for subgraph '{}' does not export table '{table}'",
                self.subgraph
            ))
        })?;
        let mut sizes: Vec<u64> = config
            .partition_sizes
            .iter()
            .copied()
            .filter(|s| *s > 0)
            .collect();
        if sizes.is_empty() {
            return Err(RuleError::config(format!(
                "table '{table}' has no non-zero partition size"
            )));
        }
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes.dedup();
        if let Some(pair) = sizes.windows(2).find(|pair| pair[0] % pair[1] != 0) {
            return Err(RuleError::config(format!(
                "table '{table}' partition size {} is not a multiple of {}",
                pair[0], pair[1]
            )));
        }
        Ok(config)
    }

    /// Directory holding every partition of `table`.
    #[must_use]
    pub fn table_dir(&self, root: &Path, table: &str) -> PathBuf {
        root.join("data")
            .join(format!("subgraph={}", self.subgraph))
            .join(format!("table={table}"))
    }

    /// Path of a single partition file of `table`.
    #[must_use]
    pub fn partition_path(&self, root: &Path, table: &str, partition: &Partition) -> PathBuf {
        self.table_dir(root, table)
            .join(format!("partition_size={}", partition.size))
            .join(format!("start_partition={}", partition.start))
            .join(format!("end_partition={}", partition.end))
            .join(PARTITION_FILE)
    }
}

impl LatestExport {
    /// Load `latest.yaml` from a dataset root.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the file can't be read and
    /// [`RuleError::Configuration`] if it is malformed.
    pub fn load(root: &Path) -> Result<Self, RuleError> {
        read_yaml(&root.join(LATEST_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_yaml() {
        let yaml = r"
subgraph: QmSubgraph
tables:
  prepaid_card_payment:
    partition_sizes: [524288, 131072, 16384]
";
        let config: DatasetConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.subgraph, "QmSubgraph");
        let table = config.table("prepaid_card_payment").unwrap();
        assert_eq!(table.partition_sizes, vec![524_288, 131_072, 16_384]);
    }

    #[test]
    fn unknown_table_is_config_error() {
        let config = DatasetConfig {
            subgraph: "s".into(),
            tables: BTreeMap::new(),
        };
        let err = config.table("safe_owner").unwrap_err();
        assert!(err.to_string().contains("safe_owner"));
    }

    #[test]
    fn zero_partition_sizes_rejected() {
        let config = DatasetConfig {
            subgraph: "s".into(),
            tables: [(
                "safe_owner".to_string(),
                TableConfig {
                    partition_sizes: vec![0],
                },
            )]
            .into_iter()
            .collect(),
        };
        assert!(config.table("safe_owner").is_err());
    }

    #[test]
    fn non_nesting_partition_sizes_rejected() {
        let config = DatasetConfig {
            subgraph: "s".into(),
            tables: [(
                "safe_owner".to_string(),
                TableConfig {
                    partition_sizes: vec![30, 100],
                },
            )]
            .into_iter()
            .collect(),
        };
        let err = config.table("safe_owner").unwrap_err();
        assert_eq!(err.category(), rulepay_types::ErrorCategory::Config);
        assert!(err.to_string().contains("not a multiple of 30"), "got: {err}");
    }

    #[test]
    fn partition_path_layout() {
        let config = DatasetConfig {
            subgraph: "QmS".into(),
            tables: BTreeMap::new(),
        };
        let path = config.partition_path(
            Path::new("/data"),
            "safe_owner",
            &Partition {
                size: 100,
                start: 200,
                end: 300,
            },
        );
        assert_eq!(
            path,
            Path::new("/data/data/subgraph=QmS/table=safe_owner/partition_size=100/start_partition=200/end_partition=300/data.parquet")
        );
    }
}
