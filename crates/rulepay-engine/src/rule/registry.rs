//! Name-keyed registry of rule constructors.

use std::collections::BTreeMap;

use rulepay_types::{CoreParameters, RuleError, UserDefinedParameters};

use super::{Rule, RuleVariant, SafeOwnership, WeightedUsage};
use crate::config::validate_core;

/// Builds a boxed rule from validated core and raw user-defined parameters.
pub type RuleConstructor =
    fn(CoreParameters, &UserDefinedParameters) -> Result<Box<dyn Rule>, RuleError>;

fn construct<R: RuleVariant>(
    core: CoreParameters,
    user_defined: &UserDefinedParameters,
) -> Result<Box<dyn Rule>, RuleError> {
    Ok(Box::new(R::from_parameters(core, user_defined)?))
}

#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    constructors: BTreeMap<String, RuleConstructor>,
}

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every rule shipped with the engine.
    #[must_use]
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry
            .constructors
            .insert(WeightedUsage::NAME.to_string(), construct::<WeightedUsage>);
        registry
            .constructors
            .insert(SafeOwnership::NAME.to_string(), construct::<SafeOwnership>);
        registry
    }

    /// Register `R` under [`RuleVariant::NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] if the name is taken.
    pub fn register<R: RuleVariant>(&mut self) -> Result<(), RuleError> {
        self.register_constructor(R::NAME, construct::<R>)
    }

    /// Register a constructor under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] if the name is taken.
    pub fn register_constructor(
        &mut self,
        name: &str,
        constructor: RuleConstructor,
    ) -> Result<(), RuleError> {
        if self.constructors.contains_key(name) {
            return Err(RuleError::config(format!(
                "rule '{name}' is already registered"
            )));
        }
        self.constructors.insert(name.to_string(), constructor);
        Ok(())
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Validate `core` and construct the rule registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Configuration`] for unknown names, invalid core
    /// parameters, or parameters the variant rejects.
    pub fn create(
        &self,
        name: &str,
        core: CoreParameters,
        user_defined: &UserDefinedParameters,
    ) -> Result<Box<dyn Rule>, RuleError> {
        let constructor = self.constructors.get(name).ok_or_else(|| {
            RuleError::config(format!(
                "unknown rule '{name}' (known rules: {})",
                self.names().join(", ")
            ))
        })?;
        validate_core(&core)?;
        let rule = constructor(core, user_defined)?;
        tracing::info!(rule = name, "Constructed rule");
        Ok(rule)
    }
}
