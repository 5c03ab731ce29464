use async_trait::async_trait;
use datafusion::scalar::ScalarValue;
use rulepay_types::{
    BlockRange, CoreParameters, PaymentRecord, RewardProgramId, RuleError, UserDefinedParameters,
};
use serde::{Deserialize, Serialize};

use super::{
    block_scalar, ensure_non_negative, parse_user_defined, payment_list, Rule, RuleVariant,
    RunContext,
};
use crate::identity::user_defined_hash;
use crate::query::RuleQuery;
use crate::table::{sum_by_payee, ResultTable};

const TABLE: &str = "prepaid_card_payment";

/// Parameters of [`WeightedUsage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedUsageParameters {
    /// Flat reward for every card owner active in the cycle.
    pub base_reward: f64,
    /// Reward per payment.
    pub transaction_factor: f64,
    /// Reward per unit spent.
    pub spend_factor: f64,
    /// Blocks the payment stays claimable for.
    pub duration: u64,
}

/// Rewards prepaid card owners for their payment activity:
/// `base_reward + transaction_factor * payments + spend_factor * spend`
/// per owner and cycle.
#[derive(Debug, Clone)]
pub struct WeightedUsage {
    core: CoreParameters,
    params: WeightedUsageParameters,
}

impl WeightedUsage {
    #[must_use]
    pub fn parameters(&self) -> &WeightedUsageParameters {
        &self.params
    }
}

impl RuleVariant for WeightedUsage {
    const NAME: &'static str = "WeightedUsage";

    fn from_parameters(
        core: CoreParameters,
        user_defined: &UserDefinedParameters,
    ) -> Result<Self, RuleError> {
        let params: WeightedUsageParameters = parse_user_defined(Self::NAME, user_defined)?;
        ensure_non_negative(Self::NAME, "base_reward", params.base_reward)?;
        ensure_non_negative(Self::NAME, "transaction_factor", params.transaction_factor)?;
        ensure_non_negative(Self::NAME, "spend_factor", params.spend_factor)?;
        Ok(Self { core, params })
    }
}

#[async_trait]
impl Rule for WeightedUsage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn core(&self) -> &CoreParameters {
        &self.core
    }

    fn user_defined_hash(&self) -> Result<String, RuleError> {
        user_defined_hash(&self.params)
    }

    fn sql(&self, ctx: &RunContext, range: BlockRange) -> Result<RuleQuery, RuleError> {
        let mut builder = ctx.query_builder(&self.core.subgraph_config_location);
        let payments = builder.table(TABLE, range)?;
        Ok(builder.finish(format!(
            "SELECT prepaid_card_owner AS payee, \
                    CAST($1 AS DOUBLE) \
                    + CAST($2 AS DOUBLE) * CAST(count(*) AS DOUBLE) \
                    + CAST($3 AS DOUBLE) * sum(CAST(spend_amount AS DOUBLE)) AS amount \
             FROM {payments} \
             WHERE block_number BETWEEN CAST($4 AS BIGINT) AND CAST($5 AS BIGINT) \
             GROUP BY prepaid_card_owner \
             ORDER BY payee"
        )))
    }

    async fn run(
        &self,
        ctx: &RunContext,
        payment_cycle: u64,
        reward_program_id: &RewardProgramId,
    ) -> Result<ResultTable, RuleError> {
        let Some(range) = self.core.cycle_range(payment_cycle) else {
            tracing::info!(
                rule = Self::NAME,
                payment_cycle,
                reward_program_id = %reward_program_id,
                "Payment cycle outside validity window"
            );
            return Ok(ResultTable::empty_payee_amounts());
        };
        let vars = vec![
            ScalarValue::Float64(Some(self.params.base_reward)),
            ScalarValue::Float64(Some(self.params.transaction_factor)),
            ScalarValue::Float64(Some(self.params.spend_factor)),
            block_scalar(range.min_block)?,
            block_scalar(range.max_block)?,
        ];
        self.run_query(ctx, range, vars).await
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
        payment_list(
            result,
            &self.core,
            reward_program_id,
            payment_cycle,
            self.params.duration,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::rule::tests::core;

    fn raw(entries: serde_json::Value) -> UserDefinedParameters {
        serde_json::from_value(entries).unwrap()
    }

    fn valid() -> UserDefinedParameters {
        raw(json!({
            "base_reward": 5,
            "transaction_factor": 2.0,
            "spend_factor": 2.0,
            "duration": 43200
        }))
    }

    #[test]
    fn parses_parameters() {
        let rule = WeightedUsage::from_parameters(core(), &valid()).unwrap();
        assert_eq!(rule.parameters().base_reward, 5.0);
        assert_eq!(rule.parameters().duration, 43_200);
    }

    #[test]
    fn missing_key_is_config_error() {
        let mut params = valid();
        params.remove("spend_factor");
        let err = WeightedUsage::from_parameters(core(), &params).unwrap_err();
        assert!(err.to_string().contains("spend_factor"), "got: {err}");
    }

    #[test]
    fn ill_typed_and_negative_values_rejected() {
        let mut params = valid();
        params.insert("duration".into(), json!("soon"));
        assert!(WeightedUsage::from_parameters(core(), &params).is_err());

        let mut params = valid();
        params.insert("transaction_factor".into(), json!(-1.0));
        let err = WeightedUsage::from_parameters(core(), &params).unwrap_err();
        assert!(err.to_string().contains("transaction_factor"));
    }

    #[test]
    fn user_defined_hash_ignores_key_order_and_tracks_values() {
        let a = WeightedUsage::from_parameters(core(), &valid()).unwrap();
        let reordered = raw(json!({
            "duration": 43200,
            "spend_factor": 2.0,
            "transaction_factor": 2.0,
            "base_reward": 5
        }));
        let b = WeightedUsage::from_parameters(core(), &reordered).unwrap();
        assert_eq!(a.identity().unwrap(), b.identity().unwrap());

        let mut changed = valid();
        changed.insert("spend_factor".into(), json!(2.5));
        let c = WeightedUsage::from_parameters(core(), &changed).unwrap();
        assert_ne!(a.identity().unwrap().rule_hash, c.identity().unwrap().rule_hash);
    }

    #[tokio::test]
    async fn cycle_outside_window_pays_nothing() {
        let rule = WeightedUsage::from_parameters(core(), &valid()).unwrap();
        let table = rule
            .run(&RunContext::local(), 300, &RewardProgramId::new("0xprogram"))
            .await
            .unwrap();
        assert!(table.is_empty());
    }
}
