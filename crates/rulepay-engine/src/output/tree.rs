//! Hash tree over payment records.
//!
//! Leaves are `sha256(0x00 ‖ canonical_json(record))`, internal nodes
//! `sha256(0x01 ‖ min(a, b) ‖ max(a, b))`. A level with an odd number of
//! nodes carries its last node up unchanged. Sorting each pair lets a proof
//! be a plain list of sibling hashes.

use std::cmp::Ordering;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, ListBuilder, StringArray, StringBuilder, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rulepay_types::{PaymentRecord, RuleError};
use sha2::{Digest, Sha256};

use super::{PaymentArtifacts, PaymentOutput};
use crate::identity::to_canonical;

type Node = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Builds a hash tree and a payment table with per-row proofs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentTree;

impl PaymentTree {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn canonical_order(a: &PaymentRecord, b: &PaymentRecord) -> Ordering {
    a.payee
        .cmp(&b.payee)
        .then_with(|| a.token.cmp(&b.token))
        .then_with(|| a.reward_program_id.cmp(&b.reward_program_id))
        .then_with(|| a.payment_cycle.cmp(&b.payment_cycle))
        .then_with(|| a.amount.total_cmp(&b.amount))
}

fn leaf_node(record: &PaymentRecord) -> Result<Node, RuleError> {
    let canonical = to_canonical(record)?;
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(canonical.as_bytes());
    Ok(hasher.finalize().into())
}

fn parent(a: &Node, b: &Node) -> Node {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// Hex leaf hash of `record`.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if the record can't be serialized.
pub fn leaf_hash(record: &PaymentRecord) -> Result<String, RuleError> {
    Ok(hex::encode(leaf_node(record)?))
}

/// Every level of the tree, leaves first, root level last.
fn build_levels(leaves: Vec<Node>) -> Vec<Vec<Node>> {
    let mut levels = vec![leaves];
    loop {
        let current = &levels[levels.len() - 1];
        if current.len() <= 1 {
            return levels;
        }
        let next: Vec<Node> = current
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => parent(a, b),
                _ => pair[0],
            })
            .collect();
        levels.push(next);
    }
}

fn root_of(levels: &[Vec<Node>]) -> String {
    match levels.last().and_then(|level| level.first()) {
        Some(root) => hex::encode(root),
        None => hex::encode(Sha256::digest(b"")),
    }
}

fn proof_of(levels: &[Vec<Node>], mut index: usize) -> Vec<String> {
    let mut proof = Vec::new();
    for level in &levels[..levels.len().saturating_sub(1)] {
        let sibling = index ^ 1;
        if let Some(node) = level.get(sibling) {
            proof.push(hex::encode(node));
        }
        index /= 2;
    }
    proof
}

/// Check that `leaf` is committed to by `root` through `proof`.
///
/// Malformed hex in any argument yields `false`.
#[must_use]
pub fn verify_proof(leaf: &str, proof: &[String], root: &str) -> bool {
    let decode = |s: &str| -> Option<Node> { hex::decode(s).ok()?.try_into().ok() };
    let Some(mut node) = decode(leaf) else {
        return false;
    };
    for sibling in proof {
        let Some(sibling) = decode(sibling) else {
            return false;
        };
        node = parent(&node, &sibling);
    }
    hex::encode(node) == root.to_ascii_lowercase()
}

fn proof_field() -> Field {
    Field::new(
        "proof",
        DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
        false,
    )
}

fn payment_schema() -> Schema {
    Schema::new(vec![
        Field::new("payee", DataType::Utf8, false),
        Field::new("amount", DataType::Float64, false),
        Field::new("token", DataType::Utf8, false),
        Field::new("reward_program_id", DataType::Utf8, false),
        Field::new("payment_cycle", DataType::UInt64, false),
        Field::new("valid_from", DataType::UInt64, false),
        Field::new("valid_to", DataType::UInt64, false),
        Field::new("leaf", DataType::Utf8, false),
        proof_field(),
    ])
}

impl PaymentOutput for PaymentTree {
    fn handoff(&self, mut payments: Vec<PaymentRecord>) -> Result<PaymentArtifacts, RuleError> {
        payments.sort_by(canonical_order);

        let leaves = payments
            .iter()
            .map(leaf_node)
            .collect::<Result<Vec<_>, _>>()?;
        let levels = build_levels(leaves);
        let root = root_of(&levels);

        let mut proofs = ListBuilder::new(StringBuilder::new());
        for index in 0..payments.len() {
            for node in proof_of(&levels, index) {
                proofs.values().append_value(node);
            }
            proofs.append(true);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(payments.iter().map(|p| &p.payee))),
            Arc::new(Float64Array::from_iter_values(payments.iter().map(|p| p.amount))),
            Arc::new(StringArray::from_iter_values(payments.iter().map(|p| &p.token))),
            Arc::new(StringArray::from_iter_values(
                payments.iter().map(|p| p.reward_program_id.as_str()),
            )),
            Arc::new(UInt64Array::from_iter_values(payments.iter().map(|p| p.payment_cycle))),
            Arc::new(UInt64Array::from_iter_values(payments.iter().map(|p| p.valid_from))),
            Arc::new(UInt64Array::from_iter_values(payments.iter().map(|p| p.valid_to))),
            Arc::new(StringArray::from_iter_values(
                levels[0].iter().map(hex::encode),
            )),
            Arc::new(proofs.finish()),
        ];
        let table = RecordBatch::try_new(Arc::new(payment_schema()), columns)
            .map_err(|e| RuleError::execution("building payment table", e))?;

        tracing::info!(payments = table.num_rows(), %root, "Payment tree built");
        Ok(PaymentArtifacts { root, table })
    }
}
