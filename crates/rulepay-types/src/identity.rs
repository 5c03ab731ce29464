//! Content-addressed identity of a configured rule.

use serde::{Deserialize, Serialize};

/// Hex digests identifying a rule configuration.
///
/// `rule_hash` is the digest of `core_hash ‖ user_defined_hash`; equal
/// parameters always give equal identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleIdentity {
    pub core_hash: String,
    pub user_defined_hash: String,
    pub rule_hash: String,
}

impl std::fmt::Display for RuleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rule_hash)
    }
}
