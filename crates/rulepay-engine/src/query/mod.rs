//! Query composition over partitioned tables and its execution.

mod builder;
mod engine;

use std::path::PathBuf;

pub use builder::PartitionedQueryBuilder;
pub use engine::QueryEngine;

/// One partitioned table scan referenced by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionScan {
    /// Relation name the SQL text refers to.
    pub alias: String,
    pub table: String,
    /// Partition files the scan reads, in partition order.
    pub files: Vec<PathBuf>,
}

/// SQL text plus the scans its table references resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleQuery {
    pub sql: String,
    pub scans: Vec<PartitionScan>,
}

impl RuleQuery {
    #[must_use]
    pub fn scan(&self, alias: &str) -> Option<&PartitionScan> {
        self.scans.iter().find(|s| s.alias == alias)
    }
}
