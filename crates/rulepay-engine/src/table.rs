//! In-memory tabular query results and column helpers.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use rulepay_types::RuleError;

/// Column holding the payee address in rule results.
pub const PAYEE_COLUMN: &str = "payee";
/// Column holding the reward amount in rule results.
pub const AMOUNT_COLUMN: &str = "amount";

/// Result set of one query: a schema plus row-aligned record batches.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

fn payee_amount_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(PAYEE_COLUMN, DataType::Utf8, false),
        Field::new(AMOUNT_COLUMN, DataType::Float64, false),
    ]))
}

impl ResultTable {
    #[must_use]
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Two-column `payee`/`amount` table, one row per map entry in key order.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the batch can't be assembled.
    pub fn payee_amounts(amounts: &BTreeMap<String, f64>) -> Result<Self, RuleError> {
        let schema = payee_amount_schema();
        let payees: ArrayRef = Arc::new(StringArray::from_iter_values(amounts.keys()));
        let values: ArrayRef = Arc::new(Float64Array::from_iter_values(amounts.values().copied()));
        let batch = RecordBatch::try_new(schema.clone(), vec![payees, values])
            .map_err(|e| RuleError::execution("building payee/amount table", e))?;
        Ok(Self::new(schema, vec![batch]))
    }

    /// Empty `payee`/`amount` table.
    #[must_use]
    pub fn empty_payee_amounts() -> Self {
        Self::new(payee_amount_schema(), Vec::new())
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// All rows as a single batch.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the batches don't share the schema.
    pub fn to_batch(&self) -> Result<RecordBatch, RuleError> {
        concat_batches(&self.schema, &self.batches)
            .map_err(|e| RuleError::execution("concatenating result batches", e))
    }

    fn column_arrays(&self, name: &str, target: &DataType) -> Result<Vec<ArrayRef>, RuleError> {
        let index = self.schema.index_of(name).map_err(|_| {
            RuleError::execution_msg(
                "reading query result",
                format!(
                    "missing column '{name}' (columns: {})",
                    self.column_names().join(", ")
                ),
            )
        })?;
        self.batches
            .iter()
            .map(|batch| {
                let column = batch.column(index);
                if column.null_count() > 0 {
                    return Err(RuleError::execution_msg(
                        "reading query result",
                        format!("column '{name}' contains nulls"),
                    ));
                }
                cast(column, target).map_err(|e| {
                    RuleError::execution(format!("casting column '{name}' to {target}"), e)
                })
            })
            .collect()
    }

    /// Values of a string-like column, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the column is missing, contains
    /// nulls, or can't be cast to UTF-8.
    pub fn string_column(&self, name: &str) -> Result<Vec<String>, RuleError> {
        let mut values = Vec::with_capacity(self.num_rows());
        for array in self.column_arrays(name, &DataType::Utf8)? {
            values.extend(array.as_string::<i32>().iter().flatten().map(str::to_string));
        }
        Ok(values)
    }

    /// Values of a numeric column as `f64`, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the column is missing, contains
    /// nulls, or isn't numeric.
    pub fn f64_column(&self, name: &str) -> Result<Vec<f64>, RuleError> {
        let mut values = Vec::with_capacity(self.num_rows());
        for array in self.column_arrays(name, &DataType::Float64)? {
            values.extend(array.as_primitive::<Float64Type>().values().iter().copied());
        }
        Ok(values)
    }

    /// `(payee, amount)` pairs in row order.
    ///
    /// # Errors
    ///
    /// See [`ResultTable::string_column`] and [`ResultTable::f64_column`].
    pub fn payee_amount_rows(&self) -> Result<Vec<(String, f64)>, RuleError> {
        let payees = self.string_column(PAYEE_COLUMN)?;
        let amounts = self.f64_column(AMOUNT_COLUMN)?;
        Ok(payees.into_iter().zip(amounts).collect())
    }
}

/// Sum `amount` per `payee` across all tables.
///
/// Summation is associative and commutative over payees, so the result does
/// not depend on how rows were split across tables. Rows are folded in
/// table order, keeping float rounding reproducible.
///
/// # Errors
///
/// Returns [`RuleError::Execution`] if a table lacks the `payee`/`amount` columns.
pub fn sum_by_payee(tables: &[ResultTable]) -> Result<BTreeMap<String, f64>, RuleError> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for table in tables {
        for (payee, amount) in table.payee_amount_rows()? {
            *totals.entry(payee).or_insert(0.0) += amount;
        }
    }
    Ok(totals)
}
