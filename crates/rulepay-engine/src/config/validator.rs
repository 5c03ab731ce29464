//! Semantic validation for parsed parameter documents.

use std::sync::LazyLock;

use regex::Regex;
use rulepay_types::{CoreParameters, ParameterDocument, RuleError};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid token address regex"));

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid table name regex"));

fn core_errors(core: &CoreParameters, errors: &mut Vec<String>) {
    if core.payment_cycle_length == 0 {
        errors.push("payment_cycle_length must be > 0".to_string());
    }
    if core.valid_from > core.valid_to {
        errors.push(format!(
            "valid_from ({}) must not be after valid_to ({})",
            core.valid_from, core.valid_to
        ));
    }
    if !TOKEN_RE.is_match(&core.token) {
        errors.push(format!(
            "token '{}' is not a 0x-prefixed 40 hex digit address",
            core.token
        ));
    }
    if core.subgraph_config_location.is_empty() {
        errors.push("subgraph_config_location must map at least one table".to_string());
    }
    for (table, location) in &core.subgraph_config_location {
        if !TABLE_RE.is_match(table) {
            errors.push(format!(
                "subgraph_config_location: '{table}' is not a lowercase table name"
            ));
        }
        if location.trim().is_empty() {
            errors.push(format!("subgraph_config_location: empty location for '{table}'"));
        }
    }
}

fn into_result(errors: Vec<String>) -> Result<(), RuleError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(RuleError::config(format!(
            "parameter validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

/// Validate core parameters, reporting every problem at once.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] listing all validation failures.
pub fn validate_core(core: &CoreParameters) -> Result<(), RuleError> {
    let mut errors = Vec::new();
    core_errors(core, &mut errors);
    into_result(errors)
}

/// Validate a whole parameter document, reporting every problem at once.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] listing all validation failures.
pub fn validate_document(document: &ParameterDocument) -> Result<(), RuleError> {
    let mut errors = Vec::new();
    core_errors(&document.core, &mut errors);

    if document.run.reward_program_id.as_str().trim().is_empty() {
        errors.push("run.reward_program_id must not be empty".to_string());
    }
    if document.run.cycles == 0 {
        errors.push("run.cycles must be at least 1".to_string());
    }
    if let Some(rule) = &document.rule {
        if rule.as_str().trim().is_empty() {
            errors.push("rule must not be empty when given".to_string());
        }
    }

    into_result(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_parameters_str;

    fn valid_yaml() -> &'static str {
        r#"
core:
  subgraph_config_location:
    safe_owner: /data/safes
  payment_cycle_length: 100
  valid_from: 0
  valid_to: 200
  token: "0x0000000000000000000000000000000000000001"
user_defined:
  reward_per_safe: 10
run:
  payment_cycle: 200
  reward_program_id: "0xprogram"
"#
    }

    #[test]
    fn test_valid_document_passes() {
        let doc = parse_parameters_str(valid_yaml()).unwrap();
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_bad_token_fails() {
        let yaml = valid_yaml().replace("0x0000000000000000000000000000000000000001", "0x12");
        let doc = parse_parameters_str(&yaml).unwrap();
        let err = validate_document(&doc).unwrap_err().to_string();
        assert!(err.contains("not a 0x-prefixed"));
    }

    #[test]
    fn test_all_errors_reported_together() {
        let yaml = valid_yaml()
            .replace("payment_cycle_length: 100", "payment_cycle_length: 0")
            .replace("valid_from: 0", "valid_from: 500")
            .replace("safe_owner:", "SafeOwner:");
        let doc = parse_parameters_str(&yaml).unwrap();
        let err = validate_document(&doc).unwrap_err().to_string();
        assert!(err.contains("payment_cycle_length"));
        assert!(err.contains("valid_from (500)"));
        assert!(err.contains("'SafeOwner'"));
    }

    #[test]
    fn test_zero_cycles_and_empty_program_fail() {
        let yaml = valid_yaml().replace("\"0xprogram\"", "\"\"\n  cycles: 0");
        let doc = parse_parameters_str(&yaml).unwrap();
        let err = validate_document(&doc).unwrap_err().to_string();
        assert!(err.contains("reward_program_id"));
        assert!(err.contains("cycles"));
    }

    #[test]
    fn test_empty_locations_fail_core_validation() {
        let mut doc = parse_parameters_str(valid_yaml()).unwrap();
        doc.core.subgraph_config_location.clear();
        assert!(validate_core(&doc.core).is_err());
    }
}
