//! Persistence of payment tables as parquet.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rulepay_types::RuleError;

/// File name of the payment table inside the output directory.
pub const RESULTS_FILE: &str = "results.parquet";

/// Write `batch` to `<dir>/results.parquet`, creating `dir` if needed.
///
/// # Errors
///
/// Returns [`RuleError::Execution`] on any I/O or encoding failure.
pub fn write_parquet(dir: &Path, batch: &RecordBatch) -> Result<PathBuf, RuleError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| RuleError::execution(format!("creating {}", dir.display()), e))?;
    let path = dir.join(RESULTS_FILE);
    let file = File::create(&path)
        .map_err(|e| RuleError::execution(format!("creating {}", path.display()), e))?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .map_err(|e| RuleError::execution("opening parquet writer", e))?;
    writer
        .write(batch)
        .map_err(|e| RuleError::execution(format!("writing {}", path.display()), e))?;
    writer
        .close()
        .map_err(|e| RuleError::execution(format!("finalizing {}", path.display()), e))?;

    tracing::info!(path = %path.display(), rows = batch.num_rows(), "Payment table written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use rulepay_types::{PaymentRecord, RewardProgramId};

    use super::*;
    use crate::output::{PaymentOutput, PaymentTree};

    #[test]
    fn written_table_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let payments = vec![PaymentRecord {
            payee: "0xa".into(),
            amount: 12.5,
            token: "0x0000000000000000000000000000000000000001".into(),
            reward_program_id: RewardProgramId::new("0xprogram"),
            payment_cycle: 200,
            valid_from: 200,
            valid_to: 300,
        }];
        let artifacts = PaymentTree::new().handoff(payments).unwrap();
        let out = dir.path().join("nested/output");
        let path = write_parquet(&out, &artifacts.table).unwrap();
        assert_eq!(path, out.join(RESULTS_FILE));

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 1);
        assert_eq!(batches[0].schema().field(8).name(), "proof");
    }
}
