//! Error taxonomy for rule construction and evaluation.
//!
//! [`RuleError`] is the single error type returned by the rule pipeline.
//! None of its variants is retryable: configuration problems are fatal at
//! construction, missing operations are fatal at first use, and execution
//! failures are surfaced unchanged because rerunning a deterministic query
//! over the same data cannot produce a different answer.

use std::fmt;

/// Boxed source error carried by [`RuleError::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broad classification of a [`RuleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid core/user-defined parameters.
    Config,
    /// A rule variant does not provide a required operation.
    MissingImplementation,
    /// Storage or query failure.
    Execution,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::MissingImplementation => "missing_implementation",
            Self::Execution => "execution",
        };
        f.write_str(s)
    }
}

/// Error produced while constructing or evaluating a reward rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Invalid configuration, detected at construction.
    #[error("[config] {0}")]
    Configuration(String),

    /// The rule variant does not implement `operation`.
    #[error("[missing_implementation] rule '{rule}' does not implement `{operation}`")]
    MissingImplementation {
        rule: String,
        operation: &'static str,
    },

    /// Storage or query failure. `source` is the underlying error, untouched.
    #[error("[execution] {context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl RuleError {
    /// Configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Missing-operation error for `rule`.
    #[must_use]
    pub fn missing(rule: impl Into<String>, operation: &'static str) -> Self {
        Self::MissingImplementation {
            rule: rule.into(),
            operation,
        }
    }

    /// Execution error wrapping `source`.
    #[must_use]
    pub fn execution(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Execution error with no underlying cause other than `message`.
    #[must_use]
    pub fn execution_msg(context: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::execution(context, message)
    }

    /// Classification of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Config,
            Self::MissingImplementation { .. } => ErrorCategory::MissingImplementation,
            Self::Execution { .. } => ErrorCategory::Execution,
        }
    }

    /// Always `false`; kept so callers do not build their own retry policy.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RuleError>;
