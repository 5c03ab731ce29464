//! Run → aggregate → normalize orchestration.

use std::time::Instant;

use rulepay_types::{PaymentRecord, PaymentSummary, RuleError, RuleIdentity, RunSelection};

use crate::rule::{Rule, RunContext};

/// Outcome of evaluating a rule over a run selection.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRun {
    pub rule: String,
    pub identity: RuleIdentity,
    /// End blocks of the evaluated cycles, ascending.
    pub cycles: Vec<u64>,
    pub payments: Vec<PaymentRecord>,
    pub summary: PaymentSummary,
}

/// Evaluate `rule` for every cycle in `selection` and normalize the
/// aggregate against the last cycle.
///
/// Cycles run one after another; each is independent of the others.
///
/// # Errors
///
/// Returns the first error any rule operation reports, unchanged.
pub async fn compute_payments(
    rule: &dyn Rule,
    ctx: &RunContext,
    selection: &RunSelection,
) -> Result<PaymentRun, RuleError> {
    let started = Instant::now();
    let identity = rule.identity()?;
    let cycles = selection.payment_cycles(rule.core().payment_cycle_length);
    let Some(&last_cycle) = cycles.last() else {
        return Err(RuleError::config(format!(
            "no payment cycle selected ending at {} ({} cycles)",
            selection.payment_cycle, selection.cycles
        )));
    };

    tracing::info!(
        rule = rule.name(),
        rule_hash = %identity.rule_hash,
        reward_program_id = %selection.reward_program_id,
        cycles = cycles.len(),
        last_cycle,
        "Computing payments"
    );

    let mut partials = Vec::with_capacity(cycles.len());
    for &cycle in &cycles {
        let partial = rule.run(ctx, cycle, &selection.reward_program_id).await?;
        tracing::info!(
            rule = rule.name(),
            payment_cycle = cycle,
            rows = partial.num_rows(),
            "Cycle finished"
        );
        partials.push(partial);
    }

    let aggregated = rule.aggregate(partials)?;
    let payments =
        rule.df_to_payment_list(&aggregated, last_cycle, &selection.reward_program_id)?;
    let summary = PaymentSummary::from_payments(&payments);

    tracing::info!(
        rule = rule.name(),
        payments = payments.len(),
        total_reward = summary.total_reward,
        unique_payee = summary.unique_payee,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Payments produced"
    );

    Ok(PaymentRun {
        rule: rule.name().to_string(),
        identity,
        cycles,
        payments,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use rulepay_types::{CoreParameters, RewardProgramId};

    use super::*;
    use crate::rule::payment_list;
    use crate::table::{sum_by_payee, ResultTable};

    /// Pays every payee a fixed amount per cycle, without touching storage.
    struct Fixed {
        core: CoreParameters,
        per_cycle: BTreeMap<String, f64>,
    }

    #[async_trait]
    impl Rule for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn core(&self) -> &CoreParameters {
            &self.core
        }

        fn user_defined_hash(&self) -> Result<String, RuleError> {
            crate::identity::user_defined_hash(&self.per_cycle)
        }

        async fn run(
            &self,
            _ctx: &RunContext,
            payment_cycle: u64,
            _reward_program_id: &RewardProgramId,
        ) -> Result<ResultTable, RuleError> {
            if self.core.cycle_range(payment_cycle).is_none() {
                return Ok(ResultTable::empty_payee_amounts());
            }
            ResultTable::payee_amounts(&self.per_cycle)
        }

        fn aggregate(&self, partials: Vec<ResultTable>) -> Result<ResultTable, RuleError> {
            ResultTable::payee_amounts(&sum_by_payee(&partials)?)
        }

        fn df_to_payment_list(
            &self,
            result: &ResultTable,
            payment_cycle: u64,
            reward_program_id: &RewardProgramId,
        ) -> Result<Vec<PaymentRecord>, RuleError> {
            payment_list(result, &self.core, reward_program_id, payment_cycle, 10)
        }
    }

    fn fixed() -> Fixed {
        Fixed {
            core: CoreParameters {
                subgraph_config_location: BTreeMap::new(),
                payment_cycle_length: 100,
                valid_from: 0,
                valid_to: 200,
                token: "0x0000000000000000000000000000000000000001".to_string(),
            },
            per_cycle: [("0xa".to_string(), 10.0), ("0xb".to_string(), 3.0)]
                .into_iter()
                .collect(),
        }
    }

    #[tokio::test]
    async fn sums_contributions_across_cycles() {
        let selection = RunSelection {
            payment_cycle: 200,
            reward_program_id: RewardProgramId::new("0xprogram"),
            cycles: 2,
        };
        let run = compute_payments(&fixed(), &RunContext::local(), &selection)
            .await
            .unwrap();
        assert_eq!(run.cycles, vec![100, 200]);
        assert_eq!(run.payments.len(), 2);
        assert_eq!(run.payments[0].amount, 20.0);
        assert_eq!(run.payments[1].amount, 6.0);
        assert_eq!(run.payments[0].payment_cycle, 200);
        assert_eq!(run.summary.total_reward, 26.0);
        assert_eq!(run.summary.unique_payee, 2);
        assert_eq!(run.identity, fixed().identity().unwrap());
    }

    #[tokio::test]
    async fn cycles_outside_window_contribute_nothing() {
        let selection = RunSelection {
            payment_cycle: 300,
            reward_program_id: RewardProgramId::new("0xprogram"),
            cycles: 2,
        };
        let run = compute_payments(&fixed(), &RunContext::local(), &selection)
            .await
            .unwrap();
        assert_eq!(run.payments[0].amount, 10.0);
        assert_eq!(run.payments[0].payment_cycle, 300);
    }

    #[tokio::test]
    async fn empty_selection_is_config_error() {
        let selection = RunSelection {
            payment_cycle: 200,
            reward_program_id: RewardProgramId::new("0xprogram"),
            cycles: 0,
        };
        let err = compute_payments(&fixed(), &RunContext::local(), &selection)
            .await
            .unwrap_err();
        assert_eq!(err.category(), rulepay_types::ErrorCategory::Config);
    }
}
