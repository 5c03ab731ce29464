//! Parameter document parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rulepay_types::{ParameterDocument, RuleError};

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Replace `${VAR}` references with environment values.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] listing every referenced variable
/// that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, RuleError> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if !missing.is_empty() {
        return Err(RuleError::config(format!(
            "missing environment variable(s): {}",
            missing.join(", ")
        )));
    }

    Ok(result)
}

/// Parse a parameter document (YAML or JSON) after env var substitution.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if substitution fails or the
/// document does not match the expected shape.
pub fn parse_parameters_str(input: &str) -> Result<ParameterDocument, RuleError> {
    let substituted = substitute_env_vars(input)?;
    serde_yaml::from_str(&substituted)
        .map_err(|e| RuleError::config(format!("failed to parse parameter document: {e}")))
}

/// Parse a parameter document file.
///
/// # Errors
///
/// Returns [`RuleError::Configuration`] if the file cannot be read or is invalid.
pub fn parse_parameters(path: &Path) -> Result<ParameterDocument, RuleError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RuleError::config(format!("failed to read parameters file {}: {e}", path.display()))
    })?;
    let document = parse_parameters_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded parameter document");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
rule: WeightedUsage
core:
  subgraph_config_location:
    prepaid_card_payment: ${RP_TEST_DATA_ROOT}/prepaid_card_payments
  payment_cycle_length: 100
  valid_from: 0
  valid_to: 200
  token: "0x0000000000000000000000000000000000000001"
user_defined:
  base_reward: 5
  transaction_factor: 2.0
  spend_factor: 2.0
  duration: 43200
run:
  payment_cycle: 200
  reward_program_id: "0xprogram"
  cycles: 2
"#;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RP_TEST_HOST", "bucket.example.com");
        let input = "location: ${RP_TEST_HOST}\ncycle: 100";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("bucket.example.com"));
        assert!(!result.contains("${RP_TEST_HOST}"));
        std::env::remove_var("RP_TEST_HOST");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "payment_cycle: 100";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_multiple_missing_env_vars_all_reported() {
        let err = substitute_env_vars("${RP_MISSING_X} and ${RP_MISSING_Y}")
            .unwrap_err()
            .to_string();
        assert!(err.contains("RP_MISSING_X"));
        assert!(err.contains("RP_MISSING_Y"));
    }

    #[test]
    fn test_parse_document() {
        std::env::set_var("RP_TEST_DATA_ROOT", "/data");
        let doc = parse_parameters_str(DOCUMENT).unwrap();
        assert_eq!(doc.rule.unwrap().as_str(), "WeightedUsage");
        assert_eq!(
            doc.core.subgraph_config_location["prepaid_card_payment"],
            "/data/prepaid_card_payments"
        );
        assert_eq!(doc.run.cycles, 2);
        assert_eq!(doc.user_defined["duration"], serde_json::json!(43200));
        std::env::remove_var("RP_TEST_DATA_ROOT");
    }

    #[test]
    fn test_parse_json_document() {
        let json = r#"{
            "core": {
                "subgraph_config_location": {"safe_owner": "/data/safes"},
                "payment_cycle_length": 100,
                "valid_from": 0,
                "valid_to": 200,
                "token": "0x0000000000000000000000000000000000000001"
            },
            "user_defined": {"reward_per_safe": 10, "max_rewards": 25, "duration": 100},
            "run": {"payment_cycle": 200, "reward_program_id": "0xprogram"}
        }"#;
        let doc = parse_parameters_str(json).unwrap();
        assert!(doc.rule.is_none());
        assert_eq!(doc.run.cycles, 1);
    }

    #[test]
    fn test_unknown_core_field_rejected() {
        let yaml = r"
core:
  payment_cycle_length: 1
  colour: red
run:
  payment_cycle: 1
  reward_program_id: p
";
        let err = parse_parameters_str(yaml).unwrap_err();
        assert_eq!(err.category(), rulepay_types::ErrorCategory::Config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = parse_parameters(Path::new("/nonexistent/parameters.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/parameters.json"));
    }
}
