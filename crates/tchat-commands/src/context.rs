//! Per-message invocation context

use crate::args::{ArgValue, Args};
use crate::bot::Bot;
use crate::command::Command;
use crate::error::{CommandError, CommandResult};
use std::fmt;
use std::sync::Arc;
use tchat_common::{Author, ChannelName, Message};

/// A chat line queued for the connection to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination channel.
    pub channel: ChannelName,
    /// Text to send.
    pub content: String,
}

/// State of one message evaluated against the command surface
#[derive(Clone)]
pub struct Context {
    /// Message being dispatched.
    pub message: Arc<Message>,
    /// Prefix the content started with.
    pub prefix: Option<String>,
    /// True when a prefix matched and a command resolved with bound arguments.
    pub valid: bool,
    /// Resolved command.
    pub command: Option<Arc<Command>>,
    /// Token the command was invoked with (name or alias).
    pub invoked_with: Option<String>,
    /// Bound arguments.
    pub args: Args,
    pub(crate) failure: Option<Arc<CommandError>>,
    bot: Bot,
}

impl Context {
    /// Context for a message that matched no prefix.
    pub(crate) fn new(bot: Bot, message: Arc<Message>) -> Self {
        Self {
            message,
            prefix: None,
            valid: false,
            command: None,
            invoked_with: None,
            args: Args::default(),
            failure: None,
            bot,
        }
    }

    /// Bot handling the message.
    pub const fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Sender of the message.
    pub fn author(&self) -> &Author {
        &self.message.author
    }

    /// Channel the message was sent in.
    pub fn channel(&self) -> &ChannelName {
        &self.message.channel
    }

    /// Resolved command's primary name.
    pub fn command_name(&self) -> Option<&str> {
        self.command.as_deref().map(Command::name)
    }

    /// Positional arguments.
    pub fn positional(&self) -> &[ArgValue] {
        self.args.positional()
    }

    /// Keyword argument `name`.
    pub fn kwarg(&self, name: &str) -> Option<&ArgValue> {
        self.args.kwarg(name)
    }

    /// Failure recorded while building the context, if any.
    pub fn failure(&self) -> Option<&CommandError> {
        self.failure.as_deref()
    }

    /// Queues `content` for the channel the message came from.
    pub fn send(&self, content: impl Into<String>) -> CommandResult {
        self.bot.send(OutboundMessage {
            channel: self.message.channel.clone(),
            content: content.into(),
        })
    }

    /// Queues `content` addressed to the author.
    pub fn reply(&self, content: impl AsRef<str>) -> CommandResult {
        self.send(format!(
            "@{} {}",
            self.message.author.display_name,
            content.as_ref()
        ))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("channel", &self.message.channel)
            .field("author", &self.message.author.name)
            .field("content", &self.message.content)
            .field("prefix", &self.prefix)
            .field("valid", &self.valid)
            .field("command", &self.command_name())
            .field("invoked_with", &self.invoked_with)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
