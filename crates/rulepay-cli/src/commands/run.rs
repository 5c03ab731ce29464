use std::path::Path;

use anyhow::{Context, Result};

use rulepay_engine::output::write_parquet;
use rulepay_engine::{compute_payments, PaymentOutput, PaymentTree, RuleRegistry, RunContext};

use super::{load_parameters, ParameterArgs};

/// Execute the `run` command: compute payments and persist the payment table.
pub async fn execute(args: &ParameterArgs, output: &Path) -> Result<()> {
    // 1. Load and validate parameters
    let loaded = load_parameters(args)?;
    let document = loaded.document;

    // 2. Construct the rule
    let registry = RuleRegistry::with_builtin_rules();
    let rule = registry.create(loaded.rule.as_str(), document.core, &document.user_defined)?;

    // 3. Evaluate every selected cycle
    let ctx = RunContext::local();
    let run = compute_payments(rule.as_ref(), &ctx, &document.run)
        .await
        .with_context(|| format!("Rule '{}' failed", loaded.rule))?;
    drop(ctx);

    // 4. Hand off and persist
    let payments = run.payments.len();
    let artifacts = PaymentTree::new().handoff(run.payments)?;
    let path = write_parquet(output, &artifacts.table)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;

    println!("Rule '{}' completed successfully.", run.rule);
    println!("  Rule hash:       {}", run.identity.rule_hash);
    println!("  Cycles:          {:?}", run.cycles);
    println!("  Payments:        {payments}");
    println!("  Unique payees:   {}", run.summary.unique_payee);
    println!("  Total reward:    {}", run.summary.total_reward);
    println!("  Root:            {}", artifacts.root);
    println!("  Output:          {}", path.display());

    let json = serde_json::json!({
        "rule": run.rule,
        "identity": run.identity,
        "cycles": run.cycles,
        "summary": run.summary,
        "root": artifacts.root,
        "output": path,
    });
    println!("{json}");

    Ok(())
}
