//! Command definitions and their builder

use crate::args::{validate_signature, Args, Param};
use crate::checks::Check;
use crate::context::Context;
use crate::cooldown::Cooldown;
use crate::error::{CommandError, CommandResult, FrameworkError};
use crate::events::panic_message;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// The body of a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command with its bound arguments.
    async fn call(&self, ctx: Context, args: Args) -> CommandResult;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Context, Args) -> Fut + Send + Sync,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    async fn call(&self, ctx: Context, args: Args) -> CommandResult {
        self(ctx, args).await
    }
}

/// Hook run around a callback.
pub type Hook = Arc<dyn Fn(Context) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Hook receiving the error a callback raised.
pub type ErrorHook =
    Arc<dyn Fn(Context, Arc<CommandError>) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Wraps an async closure as a [`Hook`].
pub fn hook<F, Fut>(f: F) -> Hook
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// A chat command
#[derive(Clone)]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    handler: Arc<dyn CommandHandler>,
    params: Vec<Param>,
    checks: Vec<Check>,
    cooldowns: Vec<Cooldown>,
    before_invoke: Option<Hook>,
    after_invoke: Option<Hook>,
    on_error: Option<ErrorHook>,
    cog: Option<String>,
    no_global_checks: bool,
    description: Option<String>,
    usage: Option<String>,
}

impl Command {
    /// Creates a command with no parameters, checks or hooks.
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            handler: Arc::new(handler),
            params: Vec::new(),
            checks: Vec::new(),
            cooldowns: Vec::new(),
            before_invoke: None,
            after_invoke: None,
            on_error: None,
            cog: None,
            no_global_checks: false,
            description: None,
            usage: None,
        }
    }

    /// Adds an alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds several aliases.
    #[must_use]
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Appends a parameter to the signature.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Appends a check.
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Appends a cooldown group.
    #[must_use]
    pub fn cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldowns.push(cooldown);
        self
    }

    /// Sets the hook run before the callback.
    #[must_use]
    pub fn before_invoke<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.before_invoke = Some(hook(f));
        self
    }

    /// Sets the hook run after a successful callback.
    #[must_use]
    pub fn after_invoke<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.after_invoke = Some(hook(f));
        self
    }

    /// Sets the handler for errors raised by the callback.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Arc<CommandError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |ctx, err| f(ctx, err).boxed()));
        self
    }

    /// Skips the bot-wide checks for this command.
    #[must_use]
    pub const fn no_global_checks(mut self) -> Self {
        self.no_global_checks = true;
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the usage line.
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub(crate) fn set_cog(&mut self, cog: impl Into<String>) {
        self.cog = Some(cog.into());
    }

    /// Primary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared aliases.
    pub fn alias_list(&self) -> &[String] {
        &self.aliases
    }

    /// Parameter signature.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Command checks in evaluation order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Cooldown groups; only the first is enforced.
    pub fn cooldowns(&self) -> &[Cooldown] {
        &self.cooldowns
    }

    /// Owning cog.
    pub fn cog(&self) -> Option<&str> {
        self.cog.as_deref()
    }

    /// True when bot-wide checks are skipped.
    pub const fn skips_global_checks(&self) -> bool {
        self.no_global_checks
    }

    /// Help text.
    pub fn help(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Usage line, falling back to one built from the signature.
    pub fn usage_line(&self) -> String {
        if let Some(usage) = &self.usage {
            return usage.clone();
        }
        let mut line = self.name.clone();
        for param in &self.params {
            line.push(' ');
            match param.kind {
                crate::args::ParamKind::Required => line.push_str(&format!("<{}>", param.name)),
                crate::args::ParamKind::Variadic => line.push_str(&format!("[{}...]", param.name)),
                _ => line.push_str(&format!("[{}]", param.name)),
            }
        }
        line
    }

    pub(crate) fn before_hook(&self) -> Option<&Hook> {
        self.before_invoke.as_ref()
    }

    pub(crate) fn after_hook(&self) -> Option<&Hook> {
        self.after_invoke.as_ref()
    }

    pub(crate) fn error_hook(&self) -> Option<&ErrorHook> {
        self.on_error.as_ref()
    }

    /// Rejects empty or whitespace names, zero-rate cooldowns and malformed signatures.
    pub fn validate(&self) -> Result<(), FrameworkError> {
        for name in std::iter::once(&self.name).chain(&self.aliases) {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(FrameworkError::Configuration(format!(
                    "invalid command name or alias '{name}'"
                )));
            }
        }
        if self.cooldowns.iter().any(|cooldown| cooldown.rate == 0) {
            return Err(FrameworkError::Configuration(format!(
                "command '{}' has a cooldown allowing zero uses",
                self.name
            )));
        }
        validate_signature(&self.params).map_err(FrameworkError::Configuration)
    }

    /// Runs the callback.
    ///
    /// A panic inside the callback is returned as an error.
    pub async fn call(&self, ctx: Context, args: Args) -> CommandResult {
        match AssertUnwindSafe(self.handler.call(ctx, args)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(format!("callback panicked: {}", panic_message(panic.as_ref())).into()),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("params", &self.params)
            .field("checks", &self.checks)
            .field("cooldowns", &self.cooldowns)
            .field("cog", &self.cog)
            .field("no_global_checks", &self.no_global_checks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgType;

    async fn noop(_ctx: Context, _args: Args) -> CommandResult {
        Ok(())
    }

    #[test]
    fn test_builder_collects_parts() {
        let command = Command::new("dice", noop)
            .aliases(["roll", "d"])
            .param(Param::with_default("sides", 6).typed(ArgType::Int))
            .description("Rolls a die")
            .no_global_checks();

        assert_eq!(command.name(), "dice");
        assert_eq!(command.alias_list(), ["roll".to_string(), "d".to_string()]);
        assert!(command.skips_global_checks());
        assert_eq!(command.help(), Some("Rolls a die"));
        assert_eq!(command.usage_line(), "dice [sides]");
        assert!(command.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(Command::new("", noop).validate().is_err());
        assert!(Command::new("two words", noop).validate().is_err());
        assert!(Command::new("ok", noop).alias("").validate().is_err());
        assert!(Command::new("ok", noop)
            .param(Param::variadic("all"))
            .param(Param::required("late"))
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_zero_rate_cooldown() {
        use crate::cooldown::BucketType;
        use std::time::Duration;

        let command = Command::new("never", noop).cooldown(Cooldown::new(
            0,
            Duration::from_secs(5),
            [BucketType::User],
        ));
        assert!(matches!(command.validate(), Err(FrameworkError::Configuration(_))));
    }

    #[test]
    fn test_usage_override() {
        let command = Command::new("echo", noop)
            .param(Param::rest("text"))
            .usage("echo <anything>");
        assert_eq!(command.usage_line(), "echo <anything>");
    }
}
