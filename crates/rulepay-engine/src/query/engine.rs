//! DataFusion-powered execution of [`RuleQuery`] values.
//!
//! Every call gets its own `SessionContext`:
//! 1. Register each partition scan as a parquet view over exactly its files
//! 2. Plan the SQL text and bind `$1..$n` placeholders
//! 3. Collect the result batches into a [`ResultTable`]

use std::time::Instant;

use datafusion::prelude::{ParquetReadOptions, SessionConfig, SessionContext};
use datafusion::scalar::ScalarValue;
use rulepay_types::RuleError;

use super::{PartitionScan, RuleQuery};
use crate::table::ResultTable;

/// Executes rule queries against partition files.
///
/// Holds no connection state; each query runs in a fresh session that is
/// dropped when the query finishes.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    target_partitions: usize,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    /// Engine planning every query on a single partition, so floating point
    /// aggregates fold in file order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target_partitions: 1,
        }
    }

    fn session(&self) -> SessionContext {
        let config = SessionConfig::new().with_target_partitions(self.target_partitions);
        SessionContext::new_with_config(config)
    }

    async fn register_scan(ctx: &SessionContext, scan: &PartitionScan) -> Result<(), RuleError> {
        let paths: Vec<String> = scan
            .files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let view = ctx
            .read_parquet(paths, ParquetReadOptions::default())
            .await
            .map_err(|e| {
                RuleError::execution(format!("reading partitions of '{}'", scan.table), e)
            })?
            .into_view();
        ctx.register_table(scan.alias.as_str(), view)
            .map_err(|e| RuleError::execution(format!("registering '{}'", scan.alias), e))?;
        Ok(())
    }

    /// Run `query` with `params` bound to its `$1..$n` placeholders.
    ///
    /// Placeholders should be wrapped in a `CAST` so their type is known at
    /// planning time, e.g. `CAST($1 AS DOUBLE)`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] on any file, planning, binding or
    /// execution failure; the DataFusion error is kept as the source.
    pub async fn run_query(
        &self,
        query: &RuleQuery,
        params: Vec<ScalarValue>,
    ) -> Result<ResultTable, RuleError> {
        let started = Instant::now();
        let ctx = self.session();
        for scan in &query.scans {
            Self::register_scan(&ctx, scan).await?;
        }

        let mut df = ctx
            .sql(&query.sql)
            .await
            .map_err(|e| RuleError::execution("query planning failed", e))?;
        if !params.is_empty() {
            df = df
                .with_param_values(params)
                .map_err(|e| RuleError::execution("binding query parameters failed", e))?;
        }
        let planned_schema = df.schema().inner().clone();
        let batches = df
            .collect()
            .await
            .map_err(|e| RuleError::execution("query execution failed", e))?;
        let schema = batches
            .first()
            .map_or(planned_schema, |batch| batch.schema());

        let table = ResultTable::new(schema, batches);
        tracing::info!(
            scans = query.scans.len(),
            rows = table.num_rows(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(table)
    }
}
