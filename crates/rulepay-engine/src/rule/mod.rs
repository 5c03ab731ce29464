//! The reward rule contract and its built-in variants.
//!
//! A rule evaluates one payment cycle at a time:
//!
//! ```text
//! run(cycle) ── sql(range) ─▶ QueryEngine ─▶ partial table
//! aggregate(partials) ─▶ df_to_payment_list(..) ─▶ Vec<PaymentRecord>
//! ```

pub mod registry;
mod safe_ownership;
mod weighted_usage;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::scalar::ScalarValue;
use rulepay_types::{
    BlockRange, CoreParameters, PaymentRecord, RewardProgramId, RuleError, RuleIdentity,
    UserDefinedParameters,
};
use serde::de::DeserializeOwned;

use crate::identity::rule_identity;
use crate::partition::{LocalPartitionStore, PartitionStore};
use crate::query::{PartitionedQueryBuilder, QueryEngine, RuleQuery};
use crate::table::ResultTable;

pub use safe_ownership::{SafeOwnership, SafeOwnershipParameters};
pub use weighted_usage::{WeightedUsage, WeightedUsageParameters};

/// Collaborators shared by every rule operation of one invocation.
///
/// Built once by the entry point and passed by reference; dropping it
/// releases the store and any data it cached.
#[derive(Clone)]
pub struct RunContext {
    store: Arc<dyn PartitionStore>,
    engine: QueryEngine,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    #[must_use]
    pub fn new(store: Arc<dyn PartitionStore>) -> Self {
        Self {
            store,
            engine: QueryEngine::new(),
        }
    }

    /// Context reading datasets from local directories.
    #[must_use]
    pub fn local() -> Self {
        Self::new(Arc::new(LocalPartitionStore::new()))
    }

    #[must_use]
    pub fn store(&self) -> &dyn PartitionStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Query builder resolving tables through `locations`.
    #[must_use]
    pub fn query_builder<'a>(
        &'a self,
        locations: &'a BTreeMap<String, String>,
    ) -> PartitionedQueryBuilder<'a> {
        PartitionedQueryBuilder::new(self.store(), locations)
    }
}

/// A reward formula.
///
/// `sql` has a default that reports [`RuleError::MissingImplementation`],
/// so a variant that relies on [`Rule::run_query`] without providing its
/// query fails on first use instead of paying nothing.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Registered variant name, e.g. `WeightedUsage`.
    fn name(&self) -> &str;

    fn core(&self) -> &CoreParameters;

    /// Digest of the variant's validated user-defined parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] if the parameters can't be serialized.
    fn user_defined_hash(&self) -> Result<String, RuleError>;

    /// Query computing one partial result over `range`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MissingImplementation`] unless overridden.
    fn sql(&self, ctx: &RunContext, range: BlockRange) -> Result<RuleQuery, RuleError> {
        let _ = (ctx, range);
        Err(RuleError::missing(self.name(), "sql"))
    }

    /// Partial result of one payment cycle.
    async fn run(
        &self,
        ctx: &RunContext,
        payment_cycle: u64,
        reward_program_id: &RewardProgramId,
    ) -> Result<ResultTable, RuleError>;

    /// Fold partial results into one `payee`/`amount` table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if a partial lacks the expected columns.
    fn aggregate(&self, partials: Vec<ResultTable>) -> Result<ResultTable, RuleError>;

    /// Canonical payment records for an aggregated result.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Execution`] if the result holds invalid amounts.
    fn df_to_payment_list(
        &self,
        result: &ResultTable,
        payment_cycle: u64,
        reward_program_id: &RewardProgramId,
    ) -> Result<Vec<PaymentRecord>, RuleError>;

    /// Execute [`Rule::sql`] for `range` with `vars` bound to its placeholders.
    async fn run_query(
        &self,
        ctx: &RunContext,
        range: BlockRange,
        vars: Vec<ScalarValue>,
    ) -> Result<ResultTable, RuleError> {
        let query = self.sql(ctx, range)?;
        tracing::debug!(rule = self.name(), %range, sql = %query.sql, "Running rule query");
        ctx.engine().run_query(&query, vars).await
    }

    /// Fingerprint of the rule's full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] if the parameters can't be serialized.
    fn identity(&self) -> Result<RuleIdentity, RuleError> {
        rule_identity(self.core(), self.user_defined_hash()?)
    }
}

/// A [`Rule`] constructible by name from a parameter document.
pub trait RuleVariant: Rule + Sized + 'static {
    const NAME: &'static str;

    /// Validate `user_defined` and build the rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] on missing, unknown or
    /// ill-typed keys and on out-of-range values.
    fn from_parameters(
        core: CoreParameters,
        user_defined: &UserDefinedParameters,
    ) -> Result<Self, RuleError>;
}

/// Deserialize a variant's typed parameters from the opaque mapping.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] naming the rule on any mismatch.
pub fn parse_user_defined<T: DeserializeOwned>(
    rule: &str,
    user_defined: &UserDefinedParameters,
) -> Result<T, RuleError> {
    let value = serde_json::to_value(user_defined).map_err(|e| {
        RuleError::config(format!("{rule}: user_defined parameters are not serializable: {e}"))
    })?;
    serde_json::from_value(value)
        .map_err(|e| RuleError::config(format!("{rule}: invalid user_defined parameters: {e}")))
}

/// Reject negative and non-finite numeric parameters.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] naming the offending key.
pub fn ensure_non_negative(rule: &str, key: &str, value: f64) -> Result<(), RuleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RuleError::config(format!(
            "{rule}: '{key}' must be a finite non-negative number, got {value}"
        )))
    }
}

/// Bind a block number; block columns are stored as signed 64-bit integers.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if `block` exceeds `i64::MAX`.
pub fn block_scalar(block: u64) -> Result<ScalarValue, RuleError> {
    let block = i64::try_from(block)
        .map_err(|_| RuleError::config(format!("block number {block} exceeds i64")))?;
    Ok(ScalarValue::Int64(Some(block)))
}

/// Normalize a `payee`/`amount` table into payment records sorted by payee.
///
/// Records can be claimed from `payment_cycle` until `payment_cycle + duration`.
///
/// # Errors
///
/// Returns [`RuleError::Execution`] if columns are missing or an amount is
/// negative or non-finite.
pub fn payment_list(
    result: &ResultTable,
    core: &CoreParameters,
    reward_program_id: &RewardProgramId,
    payment_cycle: u64,
    duration: u64,
) -> Result<Vec<PaymentRecord>, RuleError> {
    let valid_to = payment_cycle.saturating_add(duration);
    let mut payments = Vec::with_capacity(result.num_rows());
    for (payee, amount) in result.payee_amount_rows()? {
        if !amount.is_finite() || amount < 0.0 {
            return Err(RuleError::execution_msg(
                "normalizing payments",
                format!("invalid amount {amount} for payee {payee}"),
            ));
        }
        payments.push(PaymentRecord {
            payee,
            amount,
            token: core.token.clone(),
            reward_program_id: reward_program_id.clone(),
            payment_cycle,
            valid_from: payment_cycle,
            valid_to,
        });
    }
    payments.sort_by(|a, b| a.payee.cmp(&b.payee));
    Ok(payments)
}
