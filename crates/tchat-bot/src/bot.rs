//! Event loop tying a connection to the command framework.

use crate::connection::{Connection, ConnectionEvent};
use crate::error::BotResult;
use crate::modules;
use std::sync::Arc;
use tchat_commands::{Bot, Event, OutboundMessage};
use tchat_config::Config;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, trace, warn};

/// USERNOTICE kinds also published as `usernotice_subscription`.
const SUBSCRIPTION_NOTICES: [&str; 2] = ["sub", "resub"];

/// Main bot structure.
pub struct TChatBot {
    bot: Bot,
    outbound: UnboundedReceiver<OutboundMessage>,
}

impl TChatBot {
    /// Builds the framework from `config`, registers the built-in modules and
    /// loads the enabled ones.
    pub fn new(config: Config) -> BotResult<Self> {
        let (sender, outbound) = mpsc::unbounded_channel();
        let enabled = config.modules.enabled.clone();
        let bot = Bot::builder().config(config).outbound(sender).build()?;

        modules::register_builtin(&bot);
        for name in &enabled {
            bot.load_module(name)?;
        }
        info!(modules = ?enabled, "Bot initialized");

        Ok(Self { bot, outbound })
    }

    /// The framework handle.
    pub const fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Runs until the connection closes, then flushes queued replies.
    pub async fn run<C: Connection>(mut self, mut connection: C) -> BotResult<()> {
        loop {
            tokio::select! {
                event = connection.next_event() => match event {
                    Some(ConnectionEvent::Closed) | None => break,
                    Some(event) => self.dispatch(event),
                },
                Some(message) = self.outbound.recv() => {
                    connection.send(message).await?;
                }
            }
        }

        info!("Connection closed");
        self.bot.publish(Event::Close);
        tokio::task::yield_now().await;
        while let Ok(message) = self.outbound.try_recv() {
            if let Err(err) = connection.send(message).await {
                warn!(error = %err, "Dropped queued message after close");
                break;
            }
        }
        Ok(())
    }

    /// Publishes the bot events for one connection event.
    pub fn dispatch(&self, event: ConnectionEvent) {
        trace!(event = ?event, "Connection event");
        match event {
            ConnectionEvent::Ready => {
                let config = self.bot.config().get();
                info!(
                    nick = %config.bot.nick,
                    channels = config.bot.initial_channels.len(),
                    "Connected"
                );
                self.bot.publish(Event::Ready);
            }
            ConnectionEvent::Message(message) => {
                if message
                    .author
                    .name
                    .eq_ignore_ascii_case(&self.bot.config().get().bot.nick)
                {
                    debug!("Ignoring own message");
                    return;
                }
                self.bot.publish(Event::Message(Arc::new(message)));
            }
            ConnectionEvent::Join { channel, user } => {
                self.bot.publish(Event::Join { channel, user });
            }
            ConnectionEvent::Part { channel, user } => {
                self.bot.publish(Event::Part { channel, user });
            }
            ConnectionEvent::Mode {
                channel,
                mode,
                user,
            } => self.bot.publish(Event::Mode {
                channel,
                mode,
                user,
            }),
            ConnectionEvent::Userstate { channel, author } => {
                self.bot.publish(Event::Userstate { channel, author });
            }
            ConnectionEvent::Usernotice {
                channel,
                author,
                tags,
            } => {
                let kind = tags.get("msg-id").cloned().unwrap_or_default();
                if SUBSCRIPTION_NOTICES.contains(&kind.as_str()) {
                    self.bot.publish(Event::UsernoticeSubscription {
                        channel: channel.clone(),
                        author,
                        tags: tags.clone(),
                    });
                }
                self.bot.publish(Event::RawUsernotice {
                    channel,
                    kind,
                    tags,
                });
            }
            ConnectionEvent::Raw(line) => self.bot.publish(Event::RawData(line)),
            ConnectionEvent::Closed => self.bot.publish(Event::Close),
        }
    }
}
