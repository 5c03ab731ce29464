//! Handoff of payment lists to verifiable, persistable artifacts.

mod tree;
mod writer;

use arrow::record_batch::RecordBatch;
use rulepay_types::{PaymentRecord, RuleError};

pub use tree::{leaf_hash, verify_proof, PaymentTree};
pub use writer::{write_parquet, RESULTS_FILE};

/// Columnar payment table plus the root committing to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentArtifacts {
    /// Hex root over all payment leaves.
    pub root: String,
    pub table: RecordBatch,
}

/// Consumer of a finished payment list.
pub trait PaymentOutput {
    /// Take ownership of `payments` and build the artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the payments can't be encoded.
    fn handoff(&self, payments: Vec<PaymentRecord>) -> Result<PaymentArtifacts, RuleError>;
}
