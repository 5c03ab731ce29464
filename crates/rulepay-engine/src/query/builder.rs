//! Builds [`RuleQuery`] values whose table references are partition scans.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use rulepay_types::{BlockRange, RuleError};

use super::{PartitionScan, RuleQuery};
use crate::partition::PartitionStore;

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid table name regex"));

/// Longest alias accepted; aliases are `<table>_<min>_<max>`.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Accumulates partition scans for one query.
///
/// ```ignore
/// let mut builder = PartitionedQueryBuilder::new(store, &core.subgraph_config_location);
/// let payments = builder.table("prepaid_card_payment", range)?;
/// let query = builder.finish(format!("SELECT count(*) FROM {payments}"));
/// ```
pub struct PartitionedQueryBuilder<'a> {
    store: &'a dyn PartitionStore,
    locations: &'a BTreeMap<String, String>,
    scans: Vec<PartitionScan>,
}

impl<'a> PartitionedQueryBuilder<'a> {
    #[must_use]
    pub fn new(store: &'a dyn PartitionStore, locations: &'a BTreeMap<String, String>) -> Self {
        Self {
            store,
            locations,
            scans: Vec::new(),
        }
    }

    /// Register a scan of `table_name` over `range` and return the relation
    /// name to interpolate into the SQL text.
    ///
    /// Requesting the same table and range twice returns the same alias
    /// without resolving files again.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] if `table_name` is not a plain
    /// lowercase identifier or has no configured location, and whatever the
    /// store reports while resolving files.
    pub fn table(&mut self, table_name: &str, range: BlockRange) -> Result<String, RuleError> {
        if !TABLE_NAME_RE.is_match(table_name) {
            return Err(RuleError::config(format!(
                "invalid table name '{table_name}': expected a lowercase identifier"
            )));
        }
        let alias = format!("{table_name}_{}_{}", range.min_block, range.max_block);
        if alias.len() > MAX_IDENTIFIER_LEN {
            return Err(RuleError::config(format!(
                "table name '{table_name}' is too long to alias"
            )));
        }
        if self.scans.iter().any(|s| s.alias == alias) {
            return Ok(alias);
        }

        let files = self.store.partition_files(self.locations, table_name, range)?;
        self.scans.push(PartitionScan {
            alias: alias.clone(),
            table: table_name.to_string(),
            files,
        });
        Ok(alias)
    }

    /// Pair the final SQL text with the registered scans.
    #[must_use]
    pub fn finish(self, sql: impl Into<String>) -> RuleQuery {
        RuleQuery {
            sql: sql.into(),
            scans: self.scans,
        }
    }
}
