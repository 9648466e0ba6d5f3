//! Default values for every configuration section.

use crate::schema::{BotConfig, Config, ModulesConfig};
use tchat_common::LoggingConfig;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "!";

/// Nick used when none is configured.
pub const DEFAULT_NICK: &str = "tchatbot";

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            modules: ModulesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: DEFAULT_NICK.to_string(),
            token: String::new(),
            prefixes: vec![DEFAULT_PREFIX.to_string()],
            case_insensitive: false,
            initial_channels: Vec::new(),
            owners: Vec::new(),
        }
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["general".to_string()],
        }
    }
}
