//! Configuration loading and persistence with atomic file operations.

use crate::schema::Config;
use crate::validator::ConfigValidator;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tchat_common::{ChannelName, TChatError};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "TCHAT_CONFIG_PATH";

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tchat.toml";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading or writing the configuration file
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParse {
        /// Variable name
        var: String,
        /// What was wrong with it
        message: String,
    },

    /// Configuration validation error
    #[error(transparent)]
    Validation(#[from] TChatError),
}

impl From<ConfigError> for TChatError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(inner) => inner,
            ConfigError::Parse(err) => Self::serialization("invalid configuration TOML", err),
            ConfigError::Serialize(err) => Self::serialization("cannot write configuration TOML", err),
            other => Self::config_with_source("failed to load configuration", other),
        }
    }
}

/// Configuration loader with atomic file operations.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this loader reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads, overrides from the environment, and validates the configuration file.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(&self.path)?;
        let mut config = Self::parse(&content)?;
        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;
        info!(path = %self.path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to file atomically.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(config)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(rendered.as_bytes())?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| ConfigError::Io(e.error))?;

        debug!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }

    /// Parses a TOML document without touching the environment.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads from `TCHAT_CONFIG_PATH`, then `tchat.toml`, falling back to defaults.
    pub fn discover() -> Result<Config, ConfigError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Self::new(path).load();
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::new(DEFAULT_CONFIG_FILE).load();
        }

        debug!("No configuration file found, using defaults");
        let mut config = Config::default();
        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        Self::apply_overrides(config, |var| env::var(var).ok())
    }

    /// Apply overrides read through `lookup`, so callers can supply their own source.
    pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TCHAT_TOKEN") {
            config.bot.token = token;
        }

        if let Some(nick) = lookup("TCHAT_NICK") {
            config.bot.nick = nick.to_lowercase();
        }

        if let Some(prefixes) = lookup("TCHAT_PREFIXES") {
            let parsed = split_list(&prefixes);
            if parsed.is_empty() {
                return Err(ConfigError::EnvParse {
                    var: "TCHAT_PREFIXES".to_string(),
                    message: "expected a comma separated list of prefixes".to_string(),
                });
            }
            config.bot.prefixes = parsed;
        }

        if let Some(channels) = lookup("TCHAT_CHANNELS") {
            config.bot.initial_channels = split_list(&channels)
                .iter()
                .map(ChannelName::new)
                .collect();
        }

        if let Some(case_insensitive) = lookup("TCHAT_CASE_INSENSITIVE") {
            config.bot.case_insensitive =
                case_insensitive
                    .parse()
                    .map_err(|e: std::str::ParseBoolError| ConfigError::EnvParse {
                        var: "TCHAT_CASE_INSENSITIVE".to_string(),
                        message: e.to_string(),
                    })?;
        }

        if let Some(level) = lookup("TCHAT_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_replace_values() {
        let mut config = Config::default();
        let lookup = lookup_from(&[
            ("TCHAT_NICK", "LoudBot"),
            ("TCHAT_PREFIXES", "?, $ ,"),
            ("TCHAT_CHANNELS", "#One,two"),
            ("TCHAT_CASE_INSENSITIVE", "true"),
        ]);

        ConfigLoader::apply_overrides(&mut config, lookup).unwrap();

        assert_eq!(config.bot.nick, "loudbot");
        assert_eq!(config.bot.prefixes, vec!["?".to_string(), "$".to_string()]);
        assert_eq!(
            config.bot.initial_channels,
            vec![ChannelName::new("one"), ChannelName::new("two")]
        );
        assert!(config.bot.case_insensitive);
    }

    #[test]
    fn test_empty_prefix_override_is_rejected() {
        let mut config = Config::default();
        let err = ConfigLoader::apply_overrides(&mut config, lookup_from(&[("TCHAT_PREFIXES", " , ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParse { ref var, .. } if var == "TCHAT_PREFIXES"));
    }

    #[test]
    fn test_bad_bool_override_is_rejected() {
        let mut config = Config::default();
        let result = ConfigLoader::apply_overrides(
            &mut config,
            lookup_from(&[("TCHAT_CASE_INSENSITIVE", "sometimes")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_partial_document_uses_defaults() {
        let config = ConfigLoader::parse("[bot]\nnick = \"partial\"\n").unwrap();
        assert_eq!(config.bot.nick, "partial");
        assert_eq!(config.bot.prefixes, vec!["!".to_string()]);
        assert_eq!(config.modules.enabled, vec!["general".to_string()]);
    }
}
