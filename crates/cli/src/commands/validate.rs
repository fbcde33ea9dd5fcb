//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    model: String,
    model_version: String,
    test_run: bool,
    decode_failure: String,
    sinks: Vec<String>,
}

impl ConfigSummary {
    fn from_config(config: &ServiceConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            model_version: config.model.resolved_version().to_string(),
            test_run: config.dispatcher.test_run,
            decode_failure: format!("{:?}", config.dispatcher.decode_failure),
            sinks: config
                .sinks
                .iter()
                .map(|s| format!("{} ({:?})", s.name, s.sink_type))
                .collect(),
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary::from_config(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - predictions are only returned".to_string());
    }

    if config.model.artifact.is_none() && config.model.constant_prediction.is_none() {
        warnings.push(
            "Neither model.artifact nor model.constant_prediction set - predicting a constant 0"
                .to_string(),
        );
    }

    if config.model.version.is_none() && config.model.run_id.is_none() {
        warnings.push("No model version or run id - results report \"unknown\"".to_string());
    }

    if config.dispatcher.test_run {
        warnings.push("test_run is on - republish and monitoring sinks are skipped".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Model: {} ({})", summary.model, summary.model_version);
            println!("  Test run: {}", summary.test_run);
            println!("  Decode failure: {}", summary.decode_failure);
            println!("  Sinks: {}", summary.sinks.len());
            for sink in &summary.sinks {
                println!("    - {}", sink);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn validate_str(content: &str) -> ValidationResult {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        })
    }

    #[test]
    fn test_valid_config_summary() {
        let result = validate_str(
            r#"
[model]
version = "Test123"
constant_prediction = 11.0

[[sinks]]
name = "store"
sink_type = "persistence"
params = { base_path = "/tmp/predictions" }
"#,
        );

        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.model_version, "Test123");
        assert_eq!(summary.sinks, vec!["store (Persistence)".to_string()]);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_warnings_for_bare_config() {
        let result = validate_str("[dispatcher]\ntest_run = true\n");

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/config.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_invalid_sink_params() {
        let result = validate_str(
            r#"
[[sinks]]
name = "stream"
sink_type = "republish"
"#,
        );
        assert!(!result.valid);
    }
}
