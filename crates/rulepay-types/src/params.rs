//! Rule parameter model and the parameter document read by the CLI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{BlockRange, RewardProgramId, RuleName};

/// Variant-specific parameters, unpacked and validated by each rule.
pub type UserDefinedParameters = BTreeMap<String, serde_json::Value>;

/// Rule-independent configuration shared by every variant.
///
/// Stored verbatim when a rule is constructed and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreParameters {
    /// Table name -> storage location of its partitioned dataset.
    pub subgraph_config_location: BTreeMap<String, String>,
    /// Number of blocks in one payment cycle.
    pub payment_cycle_length: u64,
    /// First block of the validity window.
    pub valid_from: u64,
    /// Last cycle end block the program pays for.
    pub valid_to: u64,
    /// Reward token address.
    pub token: String,
}

impl CoreParameters {
    /// Block range covered by the cycle ending at `payment_cycle`.
    ///
    /// A cycle is identified by its (exclusive) end block and covers
    /// `payment_cycle_length` blocks before it, clipped to `valid_from`.
    /// Returns `None` when the cycle lies outside `(valid_from, valid_to]`.
    #[must_use]
    pub fn cycle_range(&self, payment_cycle: u64) -> Option<BlockRange> {
        if self.payment_cycle_length == 0
            || payment_cycle <= self.valid_from
            || payment_cycle > self.valid_to
        {
            return None;
        }
        let min_block = payment_cycle
            .saturating_sub(self.payment_cycle_length)
            .max(self.valid_from);
        Some(BlockRange {
            min_block,
            max_block: payment_cycle - 1,
        })
    }
}

fn default_cycles() -> u32 {
    1
}

/// Cycle selection supplied by the invoking process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSelection {
    /// End block of the (last) payment cycle to compute.
    pub payment_cycle: u64,
    pub reward_program_id: RewardProgramId,
    /// Number of consecutive cycles, ending at `payment_cycle`, to aggregate.
    #[serde(default = "default_cycles")]
    pub cycles: u32,
}

impl RunSelection {
    /// Single-cycle selection.
    #[must_use]
    pub fn single(payment_cycle: u64, reward_program_id: impl Into<RewardProgramId>) -> Self {
        Self {
            payment_cycle,
            reward_program_id: reward_program_id.into(),
            cycles: 1,
        }
    }

    /// End blocks of the selected cycles in ascending order.
    #[must_use]
    pub fn payment_cycles(&self, payment_cycle_length: u64) -> Vec<u64> {
        (0..u64::from(self.cycles))
            .rev()
            .filter_map(|i| {
                i.checked_mul(payment_cycle_length)
                    .and_then(|offset| self.payment_cycle.checked_sub(offset))
            })
            .collect()
    }
}

/// Top-level parameter document (`core`, `user_defined`, `run`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDocument {
    /// Rule variant to construct; may instead come from the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleName>,
    pub core: CoreParameters,
    #[serde(default)]
    pub user_defined: UserDefinedParameters,
    pub run: RunSelection,
}
