//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Largest `max_tokens` accepted.
const MAX_TOKENS_UPPER_BOUND: u32 = 1_000_000;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_llm(config)?;
    validate_memory(config)?;
    validate_attachments(config)?;
    validate_discord(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_llm(config: &Config) -> ConfigResult<()> {
    let llm = &config.llm;

    if !(llm.endpoint_url.starts_with("http://") || llm.endpoint_url.starts_with("https://")) {
        return Err(invalid(
            "llm.endpoint_url",
            format!("'{}' is not an http(s) URL", llm.endpoint_url),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(invalid("llm.model", "model must not be empty"));
    }

    if llm.max_tokens == 0 || llm.max_tokens > MAX_TOKENS_UPPER_BOUND {
        return Err(invalid(
            "llm.max_tokens",
            format!(
                "{} is out of range; must be between 1 and {MAX_TOKENS_UPPER_BOUND}",
                llm.max_tokens
            ),
        ));
    }

    if llm.timeout_secs == 0 {
        return Err(invalid("llm.timeout_secs", "timeout must be at least 1 second"));
    }

    Ok(())
}

fn validate_memory(config: &Config) -> ConfigResult<()> {
    if config.memory.path.trim().is_empty() {
        return Err(invalid("memory.path", "path must not be empty"));
    }
    if config.memory.max_turns == 0 {
        return Err(invalid("memory.max_turns", "must keep at least one turn"));
    }
    Ok(())
}

fn validate_attachments(config: &Config) -> ConfigResult<()> {
    if config.attachments.cache_capacity == 0 {
        return Err(invalid(
            "attachments.cache_capacity",
            "cache capacity must be at least 1",
        ));
    }
    Ok(())
}

fn validate_discord(config: &Config) -> ConfigResult<()> {
    if config.discord.status_interval_secs == 0 {
        return Err(invalid(
            "discord.status_interval_secs",
            "interval must be at least 1 second",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let mut config = Config::default();
        config.llm.endpoint_url = "ftp://example.com".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "llm.endpoint_url")
        );
    }

    #[test]
    fn rejects_zero_max_turns() {
        let mut config = Config::default();
        config.memory.max_turns = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_cache_capacity() {
        let mut config = Config::default();
        config.attachments.cache_capacity = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_out_of_range_max_tokens() {
        let mut config = Config::default();
        config.llm.max_tokens = 0;
        assert!(validate(&config).is_err());
        config.llm.max_tokens = MAX_TOKENS_UPPER_BOUND.saturating_add(1);
        assert!(validate(&config).is_err());
    }
}
