use anyhow::Result;

use rulepay_engine::RuleRegistry;

/// Execute the `rules` command: list registered rule variants.
pub fn execute() -> Result<()> {
    let registry = RuleRegistry::with_builtin_rules();
    for name in registry.names() {
        let rule = rulepay_types::RuleName::new(name);
        println!("{name:18} input: <input-root>/{}/parameters.json", rule.snake_case());
    }
    Ok(())
}
