//! Identifier newtypes and block ranges.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// On-chain identifier of a reward program.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardProgramId(String);

impl RewardProgramId {
    /// Create a new reward program identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RewardProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RewardProgramId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RewardProgramId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Registered name of a rule variant (e.g. `"WeightedUsage"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleName(String);

impl RuleName {
    /// Create a new rule name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `snake_case` form used for per-rule input directories
    /// (`WeightedUsage` -> `weighted_usage`).
    #[must_use]
    pub fn snake_case(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 4);
        for (i, ch) in self.0.chars().enumerate() {
            if ch.is_ascii_uppercase() {
                if i > 0 {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RuleName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RuleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Block ranges
// ---------------------------------------------------------------------------

/// Inclusive block range `[min_block, max_block]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    pub min_block: u64,
    pub max_block: u64,
}

impl BlockRange {
    /// Build a range, rejecting `min_block > max_block`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] for an inverted range.
    pub fn new(min_block: u64, max_block: u64) -> Result<Self> {
        if min_block > max_block {
            return Err(RuleError::config(format!(
                "invalid block range: min_block {min_block} > max_block {max_block}"
            )));
        }
        Ok(Self {
            min_block,
            max_block,
        })
    }

    /// Whether `block` falls inside the range.
    #[must_use]
    pub fn contains(&self, block: u64) -> bool {
        (self.min_block..=self.max_block).contains(&block)
    }

    /// Number of blocks covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.max_block - self.min_block + 1
    }

    /// Always `false`: an inclusive range covers at least one block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min_block, self.max_block)
    }
}
