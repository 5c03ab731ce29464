//! Shared reward-rule data model.
//!
//! Pure data types used by both the engine and the CLI: identifiers and
//! block ranges, rule parameters, payment records, rule identity and the
//! error taxonomy. This crate performs no I/O.

pub mod error;
pub mod identity;
pub mod ids;
pub mod params;
pub mod payment;

pub use error::{ErrorCategory, RuleError};
pub use identity::RuleIdentity;
pub use ids::{BlockRange, RewardProgramId, RuleName};
pub use params::{CoreParameters, ParameterDocument, RunSelection, UserDefinedParameters};
pub use payment::{PaymentRecord, PaymentSummary};
