//! Error types for registration and per-dispatch failures.

use crate::args::ArgType;
use crate::tokenizer::ParseError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tchat_common::BoxError;
use thiserror::Error;

/// Result returned by command callbacks and hooks.
pub type CommandResult = Result<(), BoxError>;

/// Error shared between event subscribers.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Synchronous failures of registration and bot configuration.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Invalid prefix, command signature, or similar setup mistake.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A command name or alias is already registered.
    #[error("Command or alias '{name}' is already registered")]
    DuplicateCommand {
        /// Colliding name or alias.
        name: String,
    },

    /// No command registered under the name.
    #[error("No command named '{0}'")]
    NotFound(String),

    /// Cog name taken on add, or absent on remove.
    #[error("Invalid cog: {0}")]
    InvalidCog(String),

    /// Module lifecycle failure.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Subscription failure.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Module lifecycle failures.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// `load_module` on a loaded module.
    #[error("Module '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// `unload_module` or `reload_module` on a module that is not loaded.
    #[error("Module '{0}' is not loaded")]
    NotLoaded(String),

    /// No factory registered under the name.
    #[error("Unknown module '{0}'")]
    Unknown(String),

    /// The module's `prepare` returned an error.
    #[error("Module '{module}' failed to prepare: {source}")]
    Prepare {
        /// Module name.
        module: String,
        /// Error returned by `prepare`.
        #[source]
        source: BoxError,
    },
}

/// Event bus failures.
#[derive(Debug, Error)]
pub enum EventError {
    /// The listener is not subscribed under its event name.
    #[error("Listener is not subscribed to '{event}'")]
    NotSubscribed {
        /// Event name stored on the listener.
        event: String,
    },
}

/// Hook position that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Bot-wide hook before the callback.
    GlobalBefore,
    /// Command hook before the callback.
    Before,
    /// Command hook after the callback.
    After,
    /// Bot-wide hook after the callback.
    GlobalAfter,
    /// The command's error handler.
    OnError,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GlobalBefore => "global before_invoke",
            Self::Before => "before_invoke",
            Self::After => "after_invoke",
            Self::GlobalAfter => "global after_invoke",
            Self::OnError => "on_error",
        })
    }
}

/// An exhausted cooldown bucket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Command '{command}' is on cooldown ({bucket}), retry in {:.2}s", .retry_after.as_secs_f64())]
pub struct CooldownError {
    /// Command name.
    pub command: String,
    /// Bucket strategy that ran out.
    pub bucket: String,
    /// Time until the bucket refills.
    pub retry_after: Duration,
}

/// Failures of one dispatch, delivered through the `command_error` event.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The first token does not name a command or alias; empty when no
    /// token followed the prefix.
    #[error("Command '{0}' was not found")]
    CommandNotFound(String),

    /// The message could not be tokenized.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A required parameter had no token.
    #[error("'{command}' is missing required argument '{param}'")]
    MissingArgument {
        /// Command name.
        command: String,
        /// Parameter name.
        param: String,
    },

    /// A token failed conversion.
    #[error("'{command}': argument '{param}' expected {expected}, got '{value}'")]
    BadArgument {
        /// Command name.
        command: String,
        /// Parameter name.
        param: String,
        /// Offending token.
        value: String,
        /// Requested type.
        expected: ArgType,
    },

    /// A check returned false or errored.
    #[error("Check '{check}' failed for '{command}'")]
    CheckFailure {
        /// Command name.
        command: String,
        /// Check name.
        check: String,
        /// Error raised by the check, if it raised one.
        #[source]
        source: Option<BoxError>,
    },

    /// A cooldown bucket is exhausted.
    #[error(transparent)]
    CommandOnCooldown(#[from] CooldownError),

    /// A hook returned an error.
    #[error("{stage} hook of '{command}' failed: {source}")]
    Hook {
        /// Command name.
        command: String,
        /// Hook position.
        stage: HookStage,
        /// Hook error.
        #[source]
        source: BoxError,
    },

    /// The callback returned an error.
    #[error("Command '{command}' raised an error: {source}")]
    Invoke {
        /// Command name.
        command: String,
        /// Callback error.
        #[source]
        source: BoxError,
    },
}

impl CommandError {
    /// True for unknown or missing command tokens.
    pub const fn is_command_not_found(&self) -> bool {
        matches!(self, Self::CommandNotFound(_))
    }

    /// True when the command exists but a check or cooldown refused it.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::CheckFailure { .. } | Self::CommandOnCooldown(_))
    }
}

/// Wraps a boxed error for sharing between subscribers.
pub fn share(error: BoxError) -> SharedError {
    Arc::from(error)
}
