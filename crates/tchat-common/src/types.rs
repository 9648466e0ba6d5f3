//! Chat domain types delivered by the connection layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A chat channel name, stored lowercase without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    /// Creates a channel name, normalizing case and the IRC `#` sigil.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim_start_matches('#').to_lowercase())
    }

    /// Returns the bare channel name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChannelName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(value: ChannelName) -> Self {
        value.0
    }
}

/// The chatter who sent a message, with the badge flags the gateway reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Login name (lowercase).
    pub name: String,
    /// Display name as shown in chat.
    pub display_name: String,
    /// Channel moderator.
    pub is_mod: bool,
    /// Channel subscriber.
    pub is_subscriber: bool,
    /// VIP badge.
    pub is_vip: bool,
    /// Turbo user.
    pub is_turbo: bool,
    /// Owner of the channel the message was sent in.
    pub is_broadcaster: bool,
}

impl Author {
    /// Creates a chatter with no badges.
    pub fn new(name: impl Into<String>) -> Self {
        let display_name: String = name.into();
        Self {
            name: display_name.to_lowercase(),
            display_name,
            is_mod: false,
            is_subscriber: false,
            is_vip: false,
            is_turbo: false,
            is_broadcaster: false,
        }
    }

    /// Marks the chatter as a moderator.
    #[must_use]
    pub const fn moderator(mut self) -> Self {
        self.is_mod = true;
        self
    }

    /// Marks the chatter as a subscriber.
    #[must_use]
    pub const fn subscriber(mut self) -> Self {
        self.is_subscriber = true;
        self
    }

    /// Marks the chatter as a VIP.
    #[must_use]
    pub const fn vip(mut self) -> Self {
        self.is_vip = true;
        self
    }

    /// Marks the chatter as a turbo user.
    #[must_use]
    pub const fn turbo(mut self) -> Self {
        self.is_turbo = true;
        self
    }

    /// Marks the chatter as the broadcaster.
    #[must_use]
    pub const fn broadcaster(mut self) -> Self {
        self.is_broadcaster = true;
        self
    }
}

/// An inbound chat message (PRIVMSG) with its parsed tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id tag, when the gateway provides one.
    pub id: Option<String>,
    /// Text content.
    pub content: String,
    /// Channel the message was sent in.
    pub channel: ChannelName,
    /// Sender.
    pub author: Author,
    /// Raw IRCv3 tags.
    pub tags: HashMap<String, String>,
    /// Receive time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message received now.
    pub fn new(channel: impl Into<ChannelName>, author: Author, content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            channel: channel.into(),
            author,
            tags: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attaches a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_normalizes() {
        let channel = ChannelName::new("#SomeChannel");
        assert_eq!(channel.as_str(), "somechannel");
        assert_eq!(channel.to_string(), "#somechannel");
    }

    #[test]
    fn test_channel_name_deserializes_normalized() {
        let channels: Vec<ChannelName> = serde_json::from_str(r##"["#OtherChannel", "plain"]"##).unwrap();
        assert_eq!(channels, vec![ChannelName::new("otherchannel"), ChannelName::new("plain")]);
        assert_eq!(serde_json::to_string(&channels[0]).unwrap(), r#""otherchannel""#);
    }

    #[test]
    fn test_author_login_is_lowercase() {
        let author = Author::new("CoolChatter").moderator();
        assert_eq!(author.name, "coolchatter");
        assert_eq!(author.display_name, "CoolChatter");
        assert!(author.is_mod);
        assert!(!author.is_broadcaster);
    }
}
