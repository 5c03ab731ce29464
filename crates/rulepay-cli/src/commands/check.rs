use anyhow::Result;

use rulepay_engine::{Rule, RuleRegistry};

use super::{load_parameters, ParameterArgs};

/// Execute the `check` command: validate parameters and construct the rule
/// without reading any data.
pub fn execute(args: &ParameterArgs) -> Result<()> {
    let loaded = load_parameters(args)?;
    println!("Parameters:        OK ({})", loaded.path.display());

    let registry = RuleRegistry::with_builtin_rules();
    let rule = registry.create(
        loaded.rule.as_str(),
        loaded.document.core,
        &loaded.document.user_defined,
    )?;
    println!("Rule:              OK ({})", rule.name());

    let identity = rule.identity()?;
    println!("  Core hash:         {}", identity.core_hash);
    println!("  User-defined hash: {}", identity.user_defined_hash);
    println!("  Rule hash:         {}", identity.rule_hash);

    println!("\nAll checks passed.");
    Ok(())
}
