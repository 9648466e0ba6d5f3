//! Configuration schema definitions using serde.

use serde::{Deserialize, Serialize};
use tchat_common::{ChannelName, LoggingConfig, TChatError};

/// Main configuration structure for TChat Bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat identity and command surface.
    pub bot: BotConfig,
    /// Modules loaded at startup.
    pub modules: ModulesConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Chat identity and command surface configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Login name of the bot account.
    pub nick: String,
    /// IRC oauth token (`oauth:...`).
    pub token: String,
    /// Command prefixes, tried in order.
    pub prefixes: Vec<String>,
    /// Whether command names and aliases match case-insensitively.
    pub case_insensitive: bool,
    /// Channels joined after connecting.
    pub initial_channels: Vec<ChannelName>,
    /// Login names allowed to run owner-only commands.
    pub owners: Vec<String>,
}

/// Module loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Names of the modules loaded at startup, in order.
    pub enabled: Vec<String>,
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), TChatError> {
        if self.bot.nick.trim().is_empty() {
            return Err(TChatError::validation_field(
                "nick cannot be empty",
                "bot.nick",
            ));
        }

        if self.bot.prefixes.is_empty() {
            return Err(TChatError::validation_field(
                "at least one command prefix is required",
                "bot.prefixes",
            ));
        }

        for (index, prefix) in self.bot.prefixes.iter().enumerate() {
            if prefix.is_empty() {
                return Err(TChatError::validation_field(
                    "command prefixes cannot be empty",
                    "bot.prefixes",
                ));
            }
            if self.bot.prefixes[..index].contains(prefix) {
                return Err(TChatError::validation_field(
                    format!("duplicate command prefix '{prefix}'"),
                    "bot.prefixes",
                ));
            }
        }

        for (index, module) in self.modules.enabled.iter().enumerate() {
            if self.modules.enabled[..index].contains(module) {
                return Err(TChatError::validation_field(
                    format!("module '{module}' is enabled twice"),
                    "modules.enabled",
                ));
            }
        }

        Ok(())
    }
}
