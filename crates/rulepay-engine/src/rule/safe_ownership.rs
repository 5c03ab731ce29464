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

const TABLE: &str = "safe_owner";

/// Parameters of [`SafeOwnership`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafeOwnershipParameters {
    pub reward_per_safe: f64,
    /// Cap on one owner's reward within a single cycle.
    pub max_rewards: f64,
    pub duration: u64,
}

/// Rewards owners per distinct safe they hold, capped per cycle.
#[derive(Debug, Clone)]
pub struct SafeOwnership {
    core: CoreParameters,
    params: SafeOwnershipParameters,
}

impl SafeOwnership {
    #[must_use]
    pub fn parameters(&self) -> &SafeOwnershipParameters {
        &self.params
    }
}

impl RuleVariant for SafeOwnership {
    const NAME: &'static str = "SafeOwnership";

    fn from_parameters(
        core: CoreParameters,
        user_defined: &UserDefinedParameters,
    ) -> Result<Self, RuleError> {
        let params: SafeOwnershipParameters = parse_user_defined(Self::NAME, user_defined)?;
        ensure_non_negative(Self::NAME, "reward_per_safe", params.reward_per_safe)?;
        ensure_non_negative(Self::NAME, "max_rewards", params.max_rewards)?;
        Ok(Self { core, params })
    }
}

#[async_trait]
impl Rule for SafeOwnership {
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
        let owners = builder.table(TABLE, range)?;
        Ok(builder.finish(format!(
            "SELECT owner AS payee, \
                    CASE WHEN CAST($1 AS DOUBLE) * CAST(count(DISTINCT safe) AS DOUBLE) > CAST($2 AS DOUBLE) \
                         THEN CAST($2 AS DOUBLE) \
                         ELSE CAST($1 AS DOUBLE) * CAST(count(DISTINCT safe) AS DOUBLE) \
                    END AS amount \
             FROM {owners} \
             WHERE block_number BETWEEN CAST($3 AS BIGINT) AND CAST($4 AS BIGINT) \
             GROUP BY owner \
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
            ScalarValue::Float64(Some(self.params.reward_per_safe)),
            ScalarValue::Float64(Some(self.params.max_rewards)),
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

    fn valid() -> UserDefinedParameters {
        serde_json::from_value(json!({
            "reward_per_safe": 10.0,
            "max_rewards": 25.0,
            "duration": 100
        }))
        .unwrap()
    }

    #[test]
    fn parses_parameters() {
        let rule = SafeOwnership::from_parameters(core(), &valid()).unwrap();
        assert_eq!(rule.parameters().max_rewards, 25.0);
        assert_eq!(rule.name(), "SafeOwnership");
    }

    #[test]
    fn unknown_key_is_config_error() {
        let mut params = valid();
        params.insert("bonus".into(), json!(1));
        let err = SafeOwnership::from_parameters(core(), &params).unwrap_err();
        assert_eq!(err.category(), rulepay_types::ErrorCategory::Config);
    }

    #[test]
    fn non_finite_cap_rejected() {
        let mut params = valid();
        params.insert("max_rewards".into(), json!(-3));
        assert!(SafeOwnership::from_parameters(core(), &params).is_err());
    }

    #[test]
    fn sql_references_resolved_alias_only() {
        struct FixedStore;
        impl crate::partition::PartitionStore for FixedStore {
            fn partition_files(
                &self,
                _locations: &std::collections::BTreeMap<String, String>,
                _table: &str,
                _range: BlockRange,
            ) -> Result<Vec<std::path::PathBuf>, RuleError> {
                Ok(vec!["/data/safes/data.parquet".into()])
            }
        }
        let ctx = RunContext::new(std::sync::Arc::new(FixedStore));
        let rule = SafeOwnership::from_parameters(core(), &valid()).unwrap();
        let query = rule.sql(&ctx, BlockRange::new(100, 199).unwrap()).unwrap();
        assert!(query.sql.contains("FROM safe_owner_100_199 "));
        assert!(!query.sql.contains("/data/safes"));
        assert_eq!(query.scans[0].table, "safe_owner");
    }
}
