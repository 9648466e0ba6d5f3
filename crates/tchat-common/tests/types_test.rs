//! Integration tests for tchat-common domain types.

use std::collections::HashMap;
use tchat_common::{Author, ChannelName, Message, TChatError};

#[test]
fn test_channel_name_is_hashable_and_normalized() {
    let mut map = HashMap::new();
    map.insert(ChannelName::new("#Forsen"), "first");

    assert_eq!(map.get(&ChannelName::new("forsen")), Some(&"first"));
    assert_eq!(format!("{}", ChannelName::new("FORSEN")), "#forsen");
}

#[test]
fn test_channel_name_serializes_as_string() {
    let channel = ChannelName::new("#Somebody");
    let serialized = serde_json::to_string(&channel).unwrap();
    assert_eq!(serialized, "\"somebody\"");
}

#[test]
fn test_message_builder() {
    let msg = Message::new("#chan", Author::new("Someone").subscriber(), "hello there")
        .with_tag("id", "abc-123");

    assert_eq!(msg.channel.as_str(), "chan");
    assert_eq!(msg.author.name, "someone");
    assert!(msg.author.is_subscriber);
    assert_eq!(msg.tags.get("id").map(String::as_str), Some("abc-123"));
}

#[test]
fn test_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
    let err: TChatError = io.into();
    assert!(err.to_string().starts_with("I/O error"));
}
