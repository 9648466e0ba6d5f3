//! Runtime validation beyond the schema checks in [`Config::validate`].

use crate::schema::Config;
use std::str::FromStr;
use tchat_common::{Result, TChatError};

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, including the log level filter.
    pub fn validate(config: &Config) -> Result<()> {
        config.validate()?;
        Self::validate_log_level(&config.logging.level)
    }

    /// Returns non-fatal problems worth logging at startup.
    pub fn warnings(config: &Config) -> Vec<String> {
        let mut warnings = Vec::new();

        if config.bot.token.is_empty() {
            warnings.push("no IRC token configured; only local connections will work".to_string());
        } else if !config.bot.token.starts_with("oauth:") {
            warnings.push("IRC token does not start with 'oauth:'".to_string());
        }

        if config.bot.initial_channels.is_empty() {
            warnings.push("no initial channels configured".to_string());
        }

        warnings
    }

    /// Plain levels are checked strictly; per-target directives are left to the filter.
    fn validate_log_level(level: &str) -> Result<()> {
        if level.contains('=') || level.contains(',') {
            return Ok(());
        }
        if level.eq_ignore_ascii_case("off") || tracing::Level::from_str(level).is_ok() {
            return Ok(());
        }
        Err(TChatError::validation_field(
            format!("unknown log level '{level}'"),
            "logging.level",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(ConfigValidator::validate(&config).is_err());

        config.logging.level = "tchat_commands=trace,info".to_string();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_warns_about_missing_token() {
        let warnings = ConfigValidator::warnings(&Config::default());
        assert!(warnings.iter().any(|w| w.contains("token")));
    }
}
