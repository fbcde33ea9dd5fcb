//! Config validation
//!
//! Rules:
//! - field constraints declared on the config structs (`validator` derive)
//! - sink names unique
//! - sink params required by the sink type present and non-empty
//! - constant prediction finite

use std::collections::HashSet;

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ContractError, ServiceConfig};

/// Validate a ServiceConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_model(config)?;
    validate_sink_names(config)?;
    validate_sink_params(config)?;
    Ok(())
}

/// Run the derived field constraints
fn validate_fields(config: &ServiceConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// Depth-first search for the first violated constraint, with its field path
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn validate_model(config: &ServiceConfig) -> Result<(), ContractError> {
    if let Some(value) = config.model.constant_prediction {
        if !value.is_finite() {
            return Err(ContractError::config_validation(
                "model.constant_prediction",
                format!("constant_prediction must be finite, got {value}"),
            ));
        }
    }
    Ok(())
}

/// Sink names key metrics and logs, so they must be unique
fn validate_sink_names(config: &ServiceConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &config.sinks {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_sink_params(config: &ServiceConfig) -> Result<(), ContractError> {
    for sink in &config.sinks {
        for param in sink.sink_type.required_params() {
            let present = sink
                .params
                .get(*param)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.{}", sink.name, param),
                    format!("{:?} sink requires '{}'", sink.sink_type, param),
                ));
            }
        }
    }
    Ok(())
}
