//! Validation rules applied to a fully merged [`Config`](crate::Config)
//! before it is handed back to the caller.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns a [`ConfigError::ValidationError`] naming the first offending
/// field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    field_error_if(config.policy.max_auto_tier > 2, "policy.max_auto_tier", "must be 0, 1, or 2")?;
    field_error_if(config.policy.external_max_tier > 2, "policy.external_max_tier", "must be 0, 1, or 2")?;
    field_error_if(config.model.max_tokens == 0, "model.max_tokens", "must be greater than zero")?;
    field_error_if(
        !(0.0..=2.0).contains(&config.model.temperature),
        "model.temperature",
        "must be within [0.0, 2.0]",
    )?;
    field_error_if(config.runtime.max_iterations == 0, "runtime.max_iterations", "must be greater than zero")?;
    field_error_if(config.context.total_budget == 0, "context.total_budget", "must be greater than zero")?;
    field_error_if(
        !(0.0..=1.0).contains(&config.context.rag_score_threshold),
        "context.rag_score_threshold",
        "must be within [0.0, 1.0]",
    )?;
    field_error_if(
        config.context.rag_top_k == 0 || config.context.rag_top_k > config.context.max_rag_top_k,
        "context.rag_top_k",
        "must be within [1, max_rag_top_k]",
    )?;
    field_error_if(config.delivery.max_retry == 0, "delivery.max_retry", "must be greater than zero")?;
    field_error_if(
        !matches!(config.logging.format.as_str(), "pretty" | "compact" | "json" | "full"),
        "logging.format",
        "must be one of pretty, compact, json, full",
    )?;

    Ok(())
}

fn field_error_if(condition: bool, field: &str, message: &str) -> ConfigResult<()> {
    if condition {
        Err(ConfigError::ValidationError { field: field.to_string(), message: message.to_string() })
    } else {
        Ok(())
    }
}
