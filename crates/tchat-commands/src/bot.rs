//! The bot handle: registration surface and the invocation pipeline.

use crate::args::bind;
use crate::checks::{run_checks, Check};
use crate::cog::CogEntry;
use crate::command::{hook, Command, Hook};
use crate::context::{Context, OutboundMessage};
use crate::cooldown::CooldownManager;
use crate::error::{CommandError, CommandResult, FrameworkError, HookStage};
use crate::events::{callback, Callback, DefaultEventHandler, Event, EventBus, EventHandler, Listener};
use crate::module::ModuleManager;
use crate::prefix::Prefix;
use crate::registry::Registry;
use crate::tokenizer::tokenize;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tchat_common::{BoxError, Message};
use tchat_config::{Config, ConfigCache};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, debug_span, info, trace, Instrument};

pub(crate) struct BotInner {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) cooldowns: CooldownManager,
    pub(crate) events: EventBus,
    pub(crate) cogs: RwLock<HashMap<String, CogEntry>>,
    pub(crate) modules: ModuleManager,
    prefix: Prefix,
    checks: RwLock<Vec<Check>>,
    before_invoke: Option<Hook>,
    after_invoke: Option<Hook>,
    handler: Arc<dyn EventHandler>,
    outbound: Option<UnboundedSender<OutboundMessage>>,
    config: ConfigCache,
}

/// Shared handle to the command framework. Cloning is cheap.
#[derive(Clone)]
pub struct Bot {
    pub(crate) inner: Arc<BotInner>,
}

/// Builder for [`Bot`].
#[derive(Default)]
pub struct BotBuilder {
    config: Option<Config>,
    prefix: Option<Prefix>,
    case_insensitive: Option<bool>,
    checks: Vec<Check>,
    before_invoke: Option<Hook>,
    after_invoke: Option<Hook>,
    handler: Option<Arc<dyn EventHandler>>,
    outbound: Option<UnboundedSender<OutboundMessage>>,
}

impl BotBuilder {
    /// Uses `config` for prefixes, case sensitivity and owners.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the configured prefixes.
    #[must_use]
    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Overrides the configured case sensitivity.
    #[must_use]
    pub const fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = Some(case_insensitive);
        self
    }

    /// Adds a check run before every command unless it opts out.
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Sets the hook run before every callback.
    #[must_use]
    pub fn before_invoke<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.before_invoke = Some(hook(f));
        self
    }

    /// Sets the hook run after every successful callback.
    #[must_use]
    pub fn after_invoke<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.after_invoke = Some(hook(f));
        self
    }

    /// Replaces the default event handler.
    #[must_use]
    pub fn event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Installs the queue used by [`Context::send`].
    #[must_use]
    pub fn outbound(mut self, sender: UnboundedSender<OutboundMessage>) -> Self {
        self.outbound = Some(sender);
        self
    }

    /// Builds the bot, validating the prefix.
    pub fn build(self) -> Result<Bot, FrameworkError> {
        let config = self.config.unwrap_or_default();
        let prefix = match self.prefix {
            Some(prefix) => prefix,
            None => Prefix::from_config(&config.bot)?,
        };
        prefix.validate()?;

        let registry = if self.case_insensitive.unwrap_or(config.bot.case_insensitive) {
            Registry::case_insensitive()
        } else {
            Registry::new()
        };

        debug!(prefix = ?prefix, case_insensitive = registry.is_case_insensitive(), "Building bot");

        Ok(Bot {
            inner: Arc::new(BotInner {
                registry: RwLock::new(registry),
                cooldowns: CooldownManager::new(),
                events: EventBus::new(),
                cogs: RwLock::new(HashMap::new()),
                modules: ModuleManager::new(),
                prefix,
                checks: RwLock::new(self.checks),
                before_invoke: self.before_invoke,
                after_invoke: self.after_invoke,
                handler: self
                    .handler
                    .unwrap_or_else(|| Arc::new(DefaultEventHandler)),
                outbound: self.outbound,
                config: ConfigCache::new(config),
            }),
        })
    }
}

impl Bot {
    /// Starts building a bot.
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Live configuration.
    pub fn config(&self) -> &ConfigCache {
        &self.inner.config
    }

    /// Configured owner logins.
    pub fn owners(&self) -> Vec<String> {
        self.inner.config.get().bot.owners.clone()
    }

    /// Cooldown state.
    pub fn cooldowns(&self) -> &CooldownManager {
        &self.inner.cooldowns
    }

    /// Prefix configuration.
    pub fn prefix(&self) -> &Prefix {
        &self.inner.prefix
    }

    /// Validates and registers `command`.
    pub fn add_command(&self, command: Command) -> Result<Arc<Command>, FrameworkError> {
        command.validate()?;
        let command = self.inner.registry.write().register(command)?;
        self.inner.modules.record_command(&command);
        info!(command = %command.name(), "Added command");
        Ok(command)
    }

    /// Looks up a command by name or alias.
    pub fn get_command(&self, name: &str) -> Option<Arc<Command>> {
        self.inner.registry.read().resolve(name)
    }

    /// Unregisters a command, its aliases and its cooldown buckets.
    pub fn remove_command(&self, name: &str) -> Result<Arc<Command>, FrameworkError> {
        let command = self.inner.registry.write().unregister(name)?;
        self.inner.cooldowns.reset_command(command.name());
        info!(command = %command.name(), "Removed command");
        Ok(command)
    }

    /// Registered commands, sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let registry = self.inner.registry.read();
        let mut commands: Vec<Arc<Command>> = registry.commands().cloned().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    /// Aliases pointing at `name`.
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        self.inner.registry.read().aliases_of(name)
    }

    /// Adds a bot-wide check.
    pub fn add_check(&self, check: Check) {
        self.inner.checks.write().push(check);
    }

    /// Subscribes `callback` to `event`.
    pub fn subscribe(&self, event: impl Into<String>, callback: Callback) -> Listener {
        let listener = self.inner.events.subscribe(event, callback);
        self.inner.modules.record_listener(&listener);
        listener
    }

    /// Subscribes an async closure to `event`.
    pub fn listen<F, Fut>(&self, event: impl Into<String>, f: F) -> Listener
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.subscribe(event, callback(f))
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, listener: &Listener) -> Result<(), FrameworkError> {
        self.inner.events.unsubscribe(listener)?;
        Ok(())
    }

    /// Number of subscribers of `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner.events.count(event)
    }

    /// Schedules the handler and subscribers for `event` without waiting.
    pub fn publish(&self, event: Event) {
        self.inner.events.publish(self, &self.inner.handler, event);
    }

    /// Queues a chat line on the outbound connection.
    pub fn send(&self, message: OutboundMessage) -> CommandResult {
        let sender = self
            .inner
            .outbound
            .as_ref()
            .ok_or("no outbound connection installed")?;
        sender
            .send(message)
            .map_err(|_| "outbound connection closed")?;
        Ok(())
    }

    /// Builds the context for `message`.
    ///
    /// Fails only when a dynamic prefix resolver fails. Tokenizing, lookup and
    /// binding failures are kept on the context and reported by [`Bot::invoke`].
    pub async fn get_context(&self, message: impl Into<Arc<Message>>) -> Result<Context, BoxError> {
        let message = message.into();
        let mut ctx = Context::new(self.clone(), Arc::clone(&message));

        let Some(prefix) = self.inner.prefix.find(self, &message).await? else {
            trace!("No prefix matched");
            return Ok(ctx);
        };

        let remainder = message.content[prefix.len()..].trim_start();
        ctx.prefix = Some(prefix);

        let tokens = match tokenize(remainder) {
            Ok(tokens) => tokens,
            Err(err) => {
                ctx.failure = Some(Arc::new(err.into()));
                return Ok(ctx);
            }
        };

        let mut tokens = tokens.into_iter();
        let invoked_with = tokens.next().unwrap_or_default();
        let command = self.inner.registry.read().resolve(&invoked_with);
        let Some(command) = command else {
            ctx.failure = Some(Arc::new(CommandError::CommandNotFound(invoked_with)));
            return Ok(ctx);
        };
        trace!(command = %command.name(), invoked_with = %invoked_with, "Resolved command");

        ctx.invoked_with = Some(invoked_with);
        ctx.command = Some(Arc::clone(&command));

        match bind(command.name(), command.params(), tokens.collect()) {
            Ok(args) => {
                ctx.args = args;
                ctx.valid = true;
            }
            Err(err) => ctx.failure = Some(Arc::new(err)),
        }
        Ok(ctx)
    }

    /// Runs the full pipeline for one message. Never fails outward.
    pub async fn handle_commands(&self, message: impl Into<Arc<Message>>) {
        let message = message.into();
        let span = debug_span!(
            "dispatch",
            channel = %message.channel,
            author = %message.author.name,
        );

        async move {
            match self.get_context(message).await {
                Ok(ctx) => self.invoke(ctx).await,
                Err(err) => {
                    debug!(error = %err, "Prefix resolution failed");
                    self.publish(Event::error(err, Some("prefix".to_string())));
                }
            }
        }
        .instrument(span)
        .await;
    }

    fn command_error(&self, ctx: &Context, error: impl Into<Arc<CommandError>>) {
        let error = error.into();
        debug!(error = %error, "Dispatch failed");
        self.publish(Event::CommandError {
            ctx: Box::new(ctx.clone()),
            error,
        });
    }

    fn hook_error(command: &str, stage: HookStage, source: BoxError) -> CommandError {
        CommandError::Hook {
            command: command.to_string(),
            stage,
            source,
        }
    }

    /// Runs checks, cooldowns, hooks and the callback for a built context.
    pub async fn invoke(&self, ctx: Context) {
        if ctx.prefix.is_none() {
            return;
        }
        if let Some(error) = ctx.failure.clone() {
            self.command_error(&ctx, error);
            return;
        }
        let Some(command) = ctx.command.clone() else {
            return;
        };
        let name = command.name();

        let mut checks: Vec<Check> = if command.skips_global_checks() {
            Vec::new()
        } else {
            self.inner.checks.read().clone()
        };
        checks.extend_from_slice(command.checks());
        if let Err(err) = run_checks(name, &checks, &ctx).await {
            self.command_error(&ctx, err);
            return;
        }
        trace!(command = name, "Checks passed");

        if let Some(cooldown) = command.cooldowns().first() {
            if let Err(err) = self.inner.cooldowns.update(name, 0, cooldown, &ctx) {
                self.command_error(&ctx, CommandError::from(err));
                return;
            }
        }

        if let Some(before) = &self.inner.before_invoke {
            if let Err(source) = before(ctx.clone()).await {
                let err = Self::hook_error(name, HookStage::GlobalBefore, source);
                self.publish(Event::error(Box::new(err), Some(name.to_string())));
            }
        }
        if let Some(before) = command.before_hook() {
            if let Err(source) = before(ctx.clone()).await {
                self.command_error(&ctx, Self::hook_error(name, HookStage::Before, source));
            }
        }

        debug!(command = name, "Invoking command");
        if let Err(source) = command.call(ctx.clone(), ctx.args.clone()).await {
            let error = Arc::new(CommandError::Invoke {
                command: name.to_string(),
                source,
            });
            if let Some(on_error) = command.error_hook() {
                if let Err(source) = on_error(ctx.clone(), Arc::clone(&error)).await {
                    let err = Self::hook_error(name, HookStage::OnError, source);
                    self.publish(Event::error(Box::new(err), Some(name.to_string())));
                }
            }
            self.command_error(&ctx, error);
            return;
        }

        if let Some(after) = command.after_hook() {
            if let Err(source) = after(ctx.clone()).await {
                self.command_error(&ctx, Self::hook_error(name, HookStage::After, source));
            }
        }
        if let Some(after) = &self.inner.after_invoke {
            if let Err(source) = after(ctx.clone()).await {
                let err = Self::hook_error(name, HookStage::GlobalAfter, source);
                self.publish(Event::error(Box::new(err), Some(name.to_string())));
            }
        }
        trace!(command = name, "Dispatch complete");
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cogs = self.inner.cogs.read().len();
        let commands = self.inner.registry.read().len();
        f.debug_struct("Bot")
            .field("prefix", &self.inner.prefix)
            .field("commands", &commands)
            .field("cogs", &cogs)
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use tchat_common::test_utils::message_fixtures;

    async fn noop(_ctx: Context, _args: Args) -> CommandResult {
        Ok(())
    }

    fn bot() -> Bot {
        Bot::builder().build().unwrap()
    }

    #[test]
    fn test_builder_uses_config_prefixes() {
        let mut config = Config::default();
        config.bot.prefixes = vec!["?".to_string(), "!".to_string()];
        config.bot.case_insensitive = true;
        let bot = Bot::builder().config(config).build().unwrap();

        assert!(matches!(bot.prefix(), Prefix::Set(p) if p.len() == 2));
        bot.add_command(Command::new("Hello", noop)).unwrap();
        assert!(bot.get_command("HELLO").is_some());
    }

    #[test]
    fn test_builder_rejects_empty_prefix() {
        let result = Bot::builder().prefix(Prefix::Static(String::new())).build();
        assert!(matches!(result, Err(FrameworkError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_get_context_without_prefix_is_invalid() {
        let bot = bot();
        let ctx = bot.get_context(message_fixtures::message("hello")).await.unwrap();
        assert!(ctx.prefix.is_none());
        assert!(!ctx.valid);
        assert!(ctx.failure().is_none());
    }

    #[tokio::test]
    async fn test_get_context_binds_arguments() {
        let bot = bot();
        bot.add_command(
            Command::new("echo", noop)
                .alias("say")
                .param(crate::Param::rest("text")),
        )
        .unwrap();

        let ctx = bot
            .get_context(message_fixtures::message("!  say \"hi there\" friend"))
            .await
            .unwrap();
        assert!(ctx.valid);
        assert_eq!(ctx.prefix.as_deref(), Some("!"));
        assert_eq!(ctx.command_name(), Some("echo"));
        assert_eq!(ctx.invoked_with.as_deref(), Some("say"));
        assert_eq!(
            ctx.kwarg("text").and_then(crate::ArgValue::as_str),
            Some("hi there friend")
        );
    }

    #[tokio::test]
    async fn test_get_context_records_failures() {
        let bot = bot();
        let ctx = bot.get_context(message_fixtures::message("!")).await.unwrap();
        assert!(matches!(ctx.failure(), Some(CommandError::CommandNotFound(name)) if name.is_empty()));

        let ctx = bot
            .get_context(message_fixtures::message("!play \"open"))
            .await
            .unwrap();
        assert!(matches!(ctx.failure(), Some(CommandError::Parse(_))));
    }

    #[test]
    fn test_send_without_outbound_fails() {
        let bot = bot();
        let result = bot.send(OutboundMessage {
            channel: message_fixtures::test_channel(),
            content: "hi".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_remove_command_clears_registry() {
        let bot = bot();
        bot.add_command(Command::new("ping", noop).alias("p")).unwrap();
        assert_eq!(bot.aliases_of("ping"), vec!["p".to_string()]);

        bot.remove_command("ping").unwrap();
        assert!(bot.get_command("p").is_none());
        assert!(bot.remove_command("ping").is_err());
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_dispatch_futures_are_send() {
        let bot = bot();
        assert_send(bot.handle_commands(message_fixtures::message("!ping")));
        assert_send(bot.get_context(message_fixtures::message("!ping")));
    }

    #[test]
    fn test_debug_reports_counts() {
        let bot = bot();
        bot.add_command(Command::new("ping", noop)).unwrap();
        let rendered = format!("{bot:?}");
        assert!(rendered.contains("commands: 1"), "{rendered}");
        assert!(rendered.contains("cogs: 0"), "{rendered}");
    }
}
