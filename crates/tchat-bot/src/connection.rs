//! Connection collaborators feeding the event loop.
//!
//! The real gateway transport lives outside this crate. A [`Connection`]
//! yields already-parsed [`ConnectionEvent`]s and accepts outbound lines;
//! [`ChannelConnection`] backs it with in-process channels and
//! [`ConsoleConnection`] reads chat lines from stdin for local runs.

use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tchat_commands::OutboundMessage;
use tchat_common::{Author, ChannelName, Message};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// A protocol event delivered by the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Logged in and ready.
    Ready,
    /// A chat message.
    Message(Message),
    /// A chatter joined.
    Join {
        /// Channel joined.
        channel: ChannelName,
        /// Login name.
        user: String,
    },
    /// A chatter left.
    Part {
        /// Channel left.
        channel: ChannelName,
        /// Login name.
        user: String,
    },
    /// A MODE change.
    Mode {
        /// Channel.
        channel: ChannelName,
        /// `+o` or `-o`.
        mode: String,
        /// Affected login name.
        user: String,
    },
    /// The bot's own state in a channel.
    Userstate {
        /// Channel.
        channel: ChannelName,
        /// The bot as seen by the channel.
        author: Author,
    },
    /// A USERNOTICE with its tags.
    Usernotice {
        /// Channel.
        channel: ChannelName,
        /// Chatter the notice is about.
        author: Author,
        /// All tags, including `msg-id`.
        tags: HashMap<String, String>,
    },
    /// An unparsed line.
    Raw(String),
    /// The connection closed.
    Closed,
}

/// Source of protocol events and sink for outbound messages.
#[async_trait]
pub trait Connection: Send {
    /// Waits for the next event. `None` means the connection is gone.
    ///
    /// Must be cancel safe: the event loop polls it inside `select!`.
    async fn next_event(&mut self) -> Option<ConnectionEvent>;

    /// Writes one outbound message.
    async fn send(&mut self, message: OutboundMessage) -> BotResult<()>;
}

/// Test side of a [`ChannelConnection`].
#[derive(Debug)]
pub struct ChannelHandle {
    /// Feeds events into the connection.
    pub events: UnboundedSender<ConnectionEvent>,
    /// Receives what the bot sent.
    pub sent: UnboundedReceiver<OutboundMessage>,
}

/// In-process connection backed by tokio channels.
#[derive(Debug)]
pub struct ChannelConnection {
    events: UnboundedReceiver<ConnectionEvent>,
    sent: UnboundedSender<OutboundMessage>,
}

impl ChannelConnection {
    /// Creates a connection and the handle that drives it.
    pub fn new() -> (Self, ChannelHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (
            Self {
                events: event_rx,
                sent: sent_tx,
            },
            ChannelHandle {
                events: event_tx,
                sent: sent_rx,
            },
        )
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    async fn send(&mut self, message: OutboundMessage) -> BotResult<()> {
        self.sent
            .send(message)
            .map_err(|_| BotError::Connection("outbound receiver dropped".to_string()))
    }
}

/// Reads stdin lines as chat messages in one channel and prints replies.
pub struct ConsoleConnection {
    channel: ChannelName,
    author: Author,
    lines: Lines<BufReader<Stdin>>,
    stdout: Stdout,
    started: bool,
    closed: bool,
}

impl ConsoleConnection {
    /// Messages arrive in `channel` from the broadcaster `user`.
    pub fn new(channel: ChannelName, user: &str) -> Self {
        Self {
            channel,
            author: Author::new(user).broadcaster(),
            lines: BufReader::new(tokio::io::stdin()).lines(),
            stdout: tokio::io::stdout(),
            started: false,
            closed: false,
        }
    }
}

#[async_trait]
impl Connection for ConsoleConnection {
    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if !self.started {
            self.started = true;
            return Some(ConnectionEvent::Ready);
        }
        if self.closed {
            return None;
        }

        match self.lines.next_line().await {
            Ok(Some(line)) => Some(ConnectionEvent::Message(Message::new(
                self.channel.clone(),
                self.author.clone(),
                line,
            ))),
            Ok(None) => {
                self.closed = true;
                Some(ConnectionEvent::Closed)
            }
            Err(err) => {
                debug!(error = %err, "Failed to read from stdin");
                self.closed = true;
                Some(ConnectionEvent::Closed)
            }
        }
    }

    async fn send(&mut self, message: OutboundMessage) -> BotResult<()> {
        let line = format!("[{}] {}\n", message.channel, message.content);
        self.stdout.write_all(line.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }
}
