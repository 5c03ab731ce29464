//! Block-partitioned parquet datasets written into temporary directories.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rulepay_types::CoreParameters;

pub const SUBGRAPH: &str = "QmTestSubgraph";
pub const TOKEN: &str = "0x0000000000000000000000000000000000000001";

/// One exported table: rows are split into `partition_size` block partitions
/// and every complete partition below `latest_block` gets a file.
pub struct TableExport {
    pub table: &'static str,
    pub partition_size: u64,
    pub latest_block: u64,
    pub schema: SchemaRef,
    /// All exported rows; they are split by block when written.
    pub rows: Vec<Row>,
}

/// A row: first string column, second string-or-float column, block number.
#[derive(Debug, Clone)]
pub enum Row {
    Payment {
        owner: &'static str,
        spend: f64,
        block: i64,
    },
    Safe {
        owner: &'static str,
        safe: &'static str,
        block: i64,
    },
}

impl Row {
    pub fn payment(owner: &'static str, spend: f64, block: i64) -> Self {
        Row::Payment {
            owner,
            spend,
            block,
        }
    }

    pub fn safe(owner: &'static str, safe: &'static str, block: i64) -> Self {
        Row::Safe { owner, safe, block }
    }

    fn block(&self) -> i64 {
        match self {
            Row::Payment { block, .. } | Row::Safe { block, .. } => *block,
        }
    }
}

pub fn payment_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("prepaid_card_owner", DataType::Utf8, false),
        Field::new("spend_amount", DataType::Float64, false),
        Field::new("block_number", DataType::Int64, false),
    ]))
}

pub fn safe_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("owner", DataType::Utf8, false),
        Field::new("safe", DataType::Utf8, false),
        Field::new("block_number", DataType::Int64, false),
    ]))
}

fn batch(schema: &SchemaRef, rows: &[&Row]) -> RecordBatch {
    let blocks: ArrayRef = Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.block())));
    let columns: Vec<ArrayRef> = if schema.field(0).name() == "prepaid_card_owner" {
        let owners = rows.iter().map(|r| match r {
            Row::Payment { owner, .. } => *owner,
            Row::Safe { .. } => panic!("safe row in payment table"),
        });
        let spends = rows.iter().map(|r| match r {
            Row::Payment { spend, .. } => *spend,
            Row::Safe { .. } => panic!("safe row in payment table"),
        });
        vec![
            Arc::new(StringArray::from_iter_values(owners)),
            Arc::new(Float64Array::from_iter_values(spends)),
            blocks,
        ]
    } else {
        let owners = rows.iter().map(|r| match r {
            Row::Safe { owner, .. } => *owner,
            Row::Payment { .. } => panic!("payment row in safe table"),
        });
        let safes = rows.iter().map(|r| match r {
            Row::Safe { safe, .. } => *safe,
            Row::Payment { .. } => panic!("payment row in safe table"),
        });
        vec![
            Arc::new(StringArray::from_iter_values(owners)),
            Arc::new(StringArray::from_iter_values(safes)),
            blocks,
        ]
    };
    RecordBatch::try_new(schema.clone(), columns).expect("fixture batch")
}

fn write_file(path: &Path, batch: &RecordBatch) {
    std::fs::create_dir_all(path.parent().expect("partition dir")).expect("create partition dir");
    let file = File::create(path).expect("create partition file");
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).expect("parquet writer");
    writer.write(batch).expect("write partition");
    writer.close().expect("close partition");
}

/// Write `export` under `root` and return the dataset location.
pub fn write_export(root: &Path, export: &TableExport) -> PathBuf {
    let location = root.join(export.table);
    std::fs::create_dir_all(&location).expect("create dataset root");
    std::fs::write(
        location.join("config.yaml"),
        format!(
            "subgraph: {SUBGRAPH}\ntables:\n  {}:\n    partition_sizes: [{}]\n",
            export.table, export.partition_size
        ),
    )
    .expect("write config.yaml");
    std::fs::write(
        location.join("latest.yaml"),
        format!("latest_block: {}\n", export.latest_block),
    )
    .expect("write latest.yaml");

    let size = export.partition_size;
    let mut start = 0;
    while start + size <= export.latest_block {
        let end = start + size;
        let rows: Vec<&Row> = export
            .rows
            .iter()
            .filter(|r| (start..end).contains(&(r.block() as u64)))
            .collect();
        let path = location
            .join("data")
            .join(format!("subgraph={SUBGRAPH}"))
            .join(format!("table={}", export.table))
            .join(format!("partition_size={size}"))
            .join(format!("start_partition={start}"))
            .join(format!("end_partition={end}"))
            .join("data.parquet");
        write_file(&path, &batch(&export.schema, &rows));
        start = end;
    }
    location
}

pub fn core(
    locations: BTreeMap<String, String>,
    payment_cycle_length: u64,
    valid_from: u64,
    valid_to: u64,
) -> CoreParameters {
    CoreParameters {
        subgraph_config_location: locations,
        payment_cycle_length,
        valid_from,
        valid_to,
        token: TOKEN.to_string(),
    }
}

pub fn location(table: &str, path: &Path) -> BTreeMap<String, String> {
    [(table.to_string(), path.to_string_lossy().into_owned())]
        .into_iter()
        .collect()
}
