pub mod check;
pub mod rules;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rulepay_engine::config::{parser, validator};
use rulepay_types::{ParameterDocument, RuleError, RuleName};

const PARAMETERS_FILE: &str = "parameters.json";

/// Where the parameter document comes from and which rule it configures.
#[derive(Debug, Clone, Args)]
pub struct ParameterArgs {
    /// Parameter document (YAML or JSON); overrides the per-rule default
    #[arg(long)]
    pub parameters: Option<PathBuf>,
    /// Rule to run (e.g. "WeightedUsage")
    #[arg(long, env = "RULE")]
    pub rule: Option<String>,
    /// Directory holding `<rule_name>/parameters.json` documents
    #[arg(long, default_value = "./input")]
    pub input_root: PathBuf,
}

/// A validated parameter document and the rule it is for.
#[derive(Debug)]
pub struct LoadedParameters {
    pub path: PathBuf,
    pub rule: RuleName,
    pub document: ParameterDocument,
}

/// Parameter file for `args`: `--parameters` wins, otherwise the rule's
/// default document under the input root.
fn parameters_path(args: &ParameterArgs) -> Result<PathBuf, RuleError> {
    match (&args.parameters, &args.rule) {
        (Some(path), _) => Ok(path.clone()),
        (None, Some(rule)) => Ok(default_parameters_path(
            &args.input_root,
            &RuleName::new(rule.as_str()),
        )),
        (None, None) => Err(RuleError::config(
            "no parameters given: pass --parameters, or --rule / RULE to use the default document",
        )),
    }
}

fn default_parameters_path(input_root: &Path, rule: &RuleName) -> PathBuf {
    input_root.join(rule.snake_case()).join(PARAMETERS_FILE)
}

/// The rule named on the command line and in the document must agree.
fn resolve_rule(flag: Option<&str>, document: Option<&RuleName>) -> Result<RuleName, RuleError> {
    match (flag, document) {
        (Some(flag), Some(named)) if flag != named.as_str() => Err(RuleError::config(format!(
            "rule '{flag}' does not match rule '{named}' in the parameters file"
        ))),
        (Some(flag), _) => Ok(RuleName::new(flag)),
        (None, Some(named)) => Ok(named.clone()),
        (None, None) => Err(RuleError::config(
            "no rule given: pass --rule, set RULE, or add `rule` to the parameters file",
        )),
    }
}

/// Locate, parse and validate the parameter document for `args`.
pub fn load_parameters(args: &ParameterArgs) -> Result<LoadedParameters> {
    let path = parameters_path(args)?;
    let document = parser::parse_parameters(&path)
        .with_context(|| format!("Failed to load parameters: {}", path.display()))?;
    validator::validate_document(&document)?;
    let rule = resolve_rule(args.rule.as_deref(), document.rule.as_ref())?;

    tracing::info!(
        rule = %rule,
        parameters = %path.display(),
        payment_cycle = document.run.payment_cycle,
        cycles = document.run.cycles,
        "Parameters validated"
    );

    Ok(LoadedParameters {
        path,
        rule,
        document,
    })
}
