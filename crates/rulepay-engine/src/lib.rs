//! Reward rule evaluation engine.
//!
//! A [`Rule`] turns block-partitioned event data into payment records:
//! partition files are resolved by a [`PartitionStore`], composed into a
//! query by the [`PartitionedQueryBuilder`], executed by the
//! [`QueryEngine`], folded per payee and normalized into
//! [`PaymentRecord`](rulepay_types::PaymentRecord)s that are finally
//! handed to a [`PaymentOutput`].

pub mod config;
pub mod identity;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod query;
pub mod rule;
pub mod table;

// Re-export public API for convenience
pub use output::{PaymentArtifacts, PaymentOutput, PaymentTree};
pub use partition::{LocalPartitionStore, PartitionStore};
pub use pipeline::{compute_payments, PaymentRun};
pub use query::{PartitionedQueryBuilder, QueryEngine, RuleQuery};
pub use rule::registry::RuleRegistry;
pub use rule::{Rule, RuleVariant, RunContext};
pub use table::ResultTable;
