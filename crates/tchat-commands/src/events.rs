//! Named events, the bot-level handler, and subscriber fan-out.
//!
//! Publishing never waits for handlers. The bot's [`EventHandler`] method for
//! the event and then every subscriber registered under the event name are
//! spawned as separate tasks, in that order. A task that returns an error or
//! panics is reported as an `error` event; failures while handling `error`
//! itself are only logged.

use crate::bot::Bot;
use crate::context::Context;
use crate::error::{share, CommandError, CommandResult, EventError, SharedError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tchat_common::{Author, BoxError, ChannelName, Message};
use tracing::{debug, error, warn};

/// Event names in a stable form.
pub mod names {
    /// Connection established and channels joined.
    pub const READY: &str = "ready";
    /// Chat message.
    pub const MESSAGE: &str = "message";
    /// A chatter joined.
    pub const JOIN: &str = "join";
    /// A chatter left.
    pub const PART: &str = "part";
    /// Moderator status change.
    pub const MODE: &str = "mode";
    /// The bot's own state in a channel.
    pub const USERSTATE: &str = "userstate";
    /// Any USERNOTICE.
    pub const RAW_USERNOTICE: &str = "raw_usernotice";
    /// Subscription USERNOTICE.
    pub const USERNOTICE_SUBSCRIPTION: &str = "usernotice_subscription";
    /// Unparsed gateway line.
    pub const RAW_DATA: &str = "raw_data";
    /// A dispatch failed.
    pub const COMMAND_ERROR: &str = "command_error";
    /// A handler or hook failed.
    pub const ERROR: &str = "error";
    /// Connection closed.
    pub const CLOSE: &str = "close";
}

/// Events flowing through the bus
#[derive(Debug, Clone)]
pub enum Event {
    /// Connection established.
    Ready,
    /// A chat message.
    Message(Arc<Message>),
    /// A chatter joined a channel.
    Join {
        /// Channel joined.
        channel: ChannelName,
        /// Login name.
        user: String,
    },
    /// A chatter left a channel.
    Part {
        /// Channel left.
        channel: ChannelName,
        /// Login name.
        user: String,
    },
    /// Moderator status granted (`+o`) or revoked (`-o`).
    Mode {
        /// Channel.
        channel: ChannelName,
        /// Mode string.
        mode: String,
        /// Affected login name.
        user: String,
    },
    /// The bot's badges in a channel.
    Userstate {
        /// Channel.
        channel: ChannelName,
        /// The bot as seen by the channel.
        author: Author,
    },
    /// A USERNOTICE of any kind.
    RawUsernotice {
        /// Channel.
        channel: ChannelName,
        /// Notice kind (`msg-id` tag).
        kind: String,
        /// All tags.
        tags: HashMap<String, String>,
    },
    /// A subscription or resubscription notice.
    UsernoticeSubscription {
        /// Channel.
        channel: ChannelName,
        /// Subscriber.
        author: Author,
        /// All tags.
        tags: HashMap<String, String>,
    },
    /// A raw gateway line.
    RawData(String),
    /// A dispatch failed.
    CommandError {
        /// Context of the failed dispatch.
        ctx: Box<Context>,
        /// What failed.
        error: Arc<CommandError>,
    },
    /// A handler, hook or subscriber failed.
    Error {
        /// What failed.
        error: SharedError,
        /// Where it happened, when known.
        data: Option<String>,
    },
    /// Connection closed.
    Close,
    /// Application-defined event.
    Custom {
        /// Event name.
        name: String,
        /// Payload.
        payload: serde_json::Value,
    },
}

impl Event {
    /// Stable event name used for subscriptions.
    pub fn name(&self) -> &str {
        match self {
            Self::Ready => names::READY,
            Self::Message(_) => names::MESSAGE,
            Self::Join { .. } => names::JOIN,
            Self::Part { .. } => names::PART,
            Self::Mode { .. } => names::MODE,
            Self::Userstate { .. } => names::USERSTATE,
            Self::RawUsernotice { .. } => names::RAW_USERNOTICE,
            Self::UsernoticeSubscription { .. } => names::USERNOTICE_SUBSCRIPTION,
            Self::RawData(_) => names::RAW_DATA,
            Self::CommandError { .. } => names::COMMAND_ERROR,
            Self::Error { .. } => names::ERROR,
            Self::Close => names::CLOSE,
            Self::Custom { name, .. } => name,
        }
    }

    /// Creates an application-defined event.
    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom {
            name: name.into(),
            payload,
        }
    }

    /// Creates an `error` event.
    pub fn error(error: BoxError, data: Option<String>) -> Self {
        Self::Error {
            error: share(error),
            data,
        }
    }
}

/// Bot-level handler with one method per event; every method has a default.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// `ready`
    async fn ready(&self, _bot: &Bot) -> CommandResult {
        Ok(())
    }

    /// `message`; runs the command pipeline by default.
    async fn message(&self, bot: &Bot, message: Arc<Message>) -> CommandResult {
        bot.handle_commands(message).await;
        Ok(())
    }

    /// `join`
    async fn join(&self, _bot: &Bot, _channel: &ChannelName, _user: &str) -> CommandResult {
        Ok(())
    }

    /// `part`
    async fn part(&self, _bot: &Bot, _channel: &ChannelName, _user: &str) -> CommandResult {
        Ok(())
    }

    /// `mode`
    async fn mode(&self, _bot: &Bot, _channel: &ChannelName, _mode: &str, _user: &str) -> CommandResult {
        Ok(())
    }

    /// `userstate`
    async fn userstate(&self, _bot: &Bot, _channel: &ChannelName, _author: &Author) -> CommandResult {
        Ok(())
    }

    /// `raw_usernotice`
    async fn raw_usernotice(
        &self,
        _bot: &Bot,
        _channel: &ChannelName,
        _kind: &str,
        _tags: &HashMap<String, String>,
    ) -> CommandResult {
        Ok(())
    }

    /// `usernotice_subscription`
    async fn usernotice_subscription(
        &self,
        _bot: &Bot,
        _channel: &ChannelName,
        _author: &Author,
        _tags: &HashMap<String, String>,
    ) -> CommandResult {
        Ok(())
    }

    /// `raw_data`
    async fn raw_data(&self, _bot: &Bot, _data: &str) -> CommandResult {
        Ok(())
    }

    /// `command_error`; logs by default.
    async fn command_error(&self, _bot: &Bot, ctx: &Context, error: &CommandError) -> CommandResult {
        if error.is_command_not_found() {
            debug!(channel = %ctx.channel(), author = %ctx.author().name, "{error}");
        } else {
            error!(
                channel = %ctx.channel(),
                author = %ctx.author().name,
                command = ?ctx.command_name(),
                "Ignoring exception in command: {error}"
            );
        }
        Ok(())
    }

    /// `error`; logs by default.
    async fn error(&self, _bot: &Bot, error: &SharedError, data: Option<&str>) -> CommandResult {
        error!(data = ?data, "Unhandled error in event: {error}");
        Ok(())
    }

    /// `close`
    async fn close(&self, _bot: &Bot) -> CommandResult {
        Ok(())
    }

    /// Application-defined events.
    async fn custom(&self, _bot: &Bot, _name: &str, _payload: &serde_json::Value) -> CommandResult {
        Ok(())
    }
}

/// Handler that keeps every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEventHandler;

impl EventHandler for DefaultEventHandler {}

async fn dispatch_handler(handler: &dyn EventHandler, bot: &Bot, event: &Event) -> CommandResult {
    match event {
        Event::Ready => handler.ready(bot).await,
        Event::Message(message) => handler.message(bot, Arc::clone(message)).await,
        Event::Join { channel, user } => handler.join(bot, channel, user).await,
        Event::Part { channel, user } => handler.part(bot, channel, user).await,
        Event::Mode {
            channel,
            mode,
            user,
        } => handler.mode(bot, channel, mode, user).await,
        Event::Userstate { channel, author } => handler.userstate(bot, channel, author).await,
        Event::RawUsernotice {
            channel,
            kind,
            tags,
        } => handler.raw_usernotice(bot, channel, kind, tags).await,
        Event::UsernoticeSubscription {
            channel,
            author,
            tags,
        } => handler.usernotice_subscription(bot, channel, author, tags).await,
        Event::RawData(data) => handler.raw_data(bot, data).await,
        Event::CommandError { ctx, error } => handler.command_error(bot, ctx, error).await,
        Event::Error { error, data } => handler.error(bot, error, data.as_deref()).await,
        Event::Close => handler.close(bot).await,
        Event::Custom { name, payload } => handler.custom(bot, name, payload).await,
    }
}

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(Event) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Wraps an async closure as a [`Callback`].
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |event| f(event).boxed())
}

/// Handle identifying one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Listener {
    id: u64,
    event: String,
}

impl Listener {
    /// Event name the listener is subscribed under.
    pub fn event(&self) -> &str {
        &self.event
    }
}

/// Per-name subscriber lists.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<(Listener, Callback)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `callback` to the subscribers of `event`.
    pub fn subscribe(&self, event: impl Into<String>, callback: Callback) -> Listener {
        let listener = Listener {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            event: event.into(),
        };
        self.listeners
            .write()
            .entry(listener.event.clone())
            .or_default()
            .push((listener.clone(), callback));
        debug!(event = %listener.event, id = listener.id, "Subscribed listener");
        listener
    }

    /// Removes the subscription `listener` identifies and returns its callback.
    pub fn unsubscribe(&self, listener: &Listener) -> Result<Callback, EventError> {
        let mut listeners = self.listeners.write();
        let not_subscribed = || EventError::NotSubscribed {
            event: listener.event.clone(),
        };
        let entries = listeners.get_mut(&listener.event).ok_or_else(not_subscribed)?;
        let index = entries
            .iter()
            .position(|(existing, _)| existing == listener)
            .ok_or_else(not_subscribed)?;
        let (_, callback) = entries.remove(index);
        if entries.is_empty() {
            listeners.remove(&listener.event);
        }
        debug!(event = %listener.event, id = listener.id, "Unsubscribed listener");
        Ok(callback)
    }

    /// Re-inserts a subscription removed with [`EventBus::unsubscribe`],
    /// keeping its identity.
    pub fn restore(&self, listener: Listener, callback: Callback) {
        self.listeners
            .write()
            .entry(listener.event.clone())
            .or_default()
            .push((listener, callback));
    }

    /// Callback registered for `listener`, if still subscribed.
    pub fn callback_of(&self, listener: &Listener) -> Option<Callback> {
        self.listeners
            .read()
            .get(&listener.event)?
            .iter()
            .find(|(existing, _)| existing == listener)
            .map(|(_, callback)| Arc::clone(callback))
    }

    /// Subscribers of `event` in registration order.
    pub fn subscribers(&self, event: &str) -> Vec<Callback> {
        self.listeners
            .read()
            .get(event)
            .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    /// Number of subscribers of `event`.
    pub fn count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Schedules the handler method and every subscriber for `event`.
    pub fn publish(&self, bot: &Bot, handler: &Arc<dyn EventHandler>, event: Event) {
        let name = event.name().to_string();
        let subscribers = self.subscribers(&name);
        debug!(event = %name, subscribers = subscribers.len(), "Publishing event");

        let handler = Arc::clone(handler);
        let handler_bot = bot.clone();
        let handler_event = event.clone();
        spawn_guarded(bot, &name, async move {
            dispatch_handler(handler.as_ref(), &handler_bot, &handler_event).await
        });

        for subscriber in subscribers {
            spawn_guarded(bot, &name, subscriber(event.clone()));
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn spawn_guarded<F>(bot: &Bot, event: &str, task: F)
where
    F: Future<Output = CommandResult> + Send + 'static,
{
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(event, "No async runtime available, dropping event task");
        return;
    };

    let bot = bot.clone();
    let event = event.to_string();
    runtime.spawn(async move {
        let failure: BoxError = match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(panic) => format!("panic in '{event}' handler: {}", panic_message(panic.as_ref())).into(),
        };

        if event == names::ERROR {
            error!(error = %failure, "Error handler failed");
        } else {
            bot.publish(Event::error(failure, Some(event)));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::Ready.name(), "ready");
        assert_eq!(Event::RawData("PING".to_string()).name(), "raw_data");
        assert_eq!(
            Event::custom("raid", serde_json::json!({ "viewers": 5 })).name(),
            "raid"
        );
        assert_eq!(Event::error("boom".into(), None).name(), "error");
    }

    #[test]
    fn test_subscribe_and_unsubscribe_by_identity() {
        let bus = EventBus::new();
        let first = bus.subscribe("join", callback(|_| async { Ok(()) }));
        let second = bus.subscribe("join", callback(|_| async { Ok(()) }));
        assert_ne!(first, second);
        assert_eq!(bus.count("join"), 2);

        bus.unsubscribe(&first).unwrap();
        assert_eq!(bus.count("join"), 1);
        assert!(matches!(
            bus.unsubscribe(&first),
            Err(EventError::NotSubscribed { ref event }) if event == "join"
        ));
        assert!(bus.callback_of(&second).is_some());
    }

    #[test]
    fn test_restore_keeps_identity() {
        let bus = EventBus::new();
        let listener = bus.subscribe("part", callback(|_| async { Ok(()) }));
        let callback = bus.unsubscribe(&listener).unwrap();
        assert_eq!(bus.count("part"), 0);

        bus.restore(listener.clone(), callback);
        assert!(bus.unsubscribe(&listener).is_ok());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("bad thing");
        assert_eq!(panic_message(boxed.as_ref()), "bad thing");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("worse"));
        assert_eq!(panic_message(boxed.as_ref()), "worse");
        let boxed: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(boxed.as_ref()), "handler panicked");
    }
}
