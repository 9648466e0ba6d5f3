//! Application-wide error types using thiserror.

use tchat_commands::FrameworkError;
use tchat_common::TChatError;
use tchat_config::ConfigError;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] TChatError),

    /// Command framework error.
    #[error("Framework error: {0}")]
    Framework(#[from] FrameworkError),

    /// The connection failed or went away.
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for BotError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.into())
    }
}

/// Result type for the bot application.
pub type BotResult<T> = Result<T, BotError>;
