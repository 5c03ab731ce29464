//! Canonical payment records and their summary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::RewardProgramId;

/// One payee's reward for a reward program and payment cycle.
///
/// Produced only by a rule's payment-list normalization; handed to the
/// output handoff once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payee: String,
    /// Non-negative reward amount in token units.
    pub amount: f64,
    pub token: String,
    pub reward_program_id: RewardProgramId,
    /// End block of the payment cycle the record was computed for.
    pub payment_cycle: u64,
    /// First block the payment can be claimed at.
    pub valid_from: u64,
    /// Last block the payment can be claimed at.
    pub valid_to: u64,
}

/// Totals derived from a payment list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_reward: f64,
    pub unique_payee: usize,
}

impl PaymentSummary {
    /// Sum of amounts and number of distinct payees; both zero for an empty list.
    #[must_use]
    pub fn from_payments(payments: &[PaymentRecord]) -> Self {
        let total_reward = payments.iter().map(|p| p.amount).sum();
        let unique_payee = payments
            .iter()
            .map(|p| p.payee.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        Self {
            total_reward,
            unique_payee,
        }
    }
}
