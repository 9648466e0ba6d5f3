//! Error types and utilities for TChat

use thiserror::Error;

/// Result type alias for TChat operations
pub type Result<T> = std::result::Result<T, TChatError>;

/// Boxed error used at user-callback boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for TChat operations
#[derive(Error, Debug)]
pub enum TChatError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// What failed to parse or encode
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Validation errors for user input or data
    #[error("Validation error: {message}")]
    Validation {
        /// Why the value was rejected
        message: String,
        /// Dotted path of the offending field
        field: Option<String>,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Generic {
        /// Error message
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },
}

impl TChatError {
    /// Create a new generic error with a custom message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new generic error with a custom message and source
    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generic {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new serialization error with source
    pub fn serialization(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error for a specific field
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Returns true for configuration and validation errors
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_generic_error_display() {
        let err = TChatError::new("something broke");
        assert_eq!(err.to_string(), "something broke");
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_config_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = TChatError::config_with_source("cannot read tchat.toml", io);
        assert_eq!(err.to_string(), "Configuration error: cannot read tchat.toml");
        assert!(err.source().is_some());
        assert!(err.is_config_error());
    }

    #[test]
    fn test_validation_field() {
        let err = TChatError::validation_field("must not be empty", "bot.nick");
        match err {
            TChatError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("bot.nick")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
