//! Integration tests for the event loop and the built-in modules.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tchat_bot::{BotError, ChannelConnection, ChannelHandle, ConnectionEvent, TChatBot};
use tchat_commands::Event;
use tchat_common::test_utils::init_test_logging;
use tchat_common::test_utils::message_fixtures::{message, message_from, moderator, test_channel};
use tchat_common::{Author, Message};
use tchat_config::Config;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

fn config(modules: &[&str]) -> Config {
    let mut config = Config::default();
    config.bot.owners = vec!["owner".to_string()];
    config.modules.enabled = modules.iter().map(|m| (*m).to_string()).collect();
    config
}

fn start(bot: TChatBot) -> (ChannelHandle, JoinHandle<Result<(), BotError>>) {
    let (connection, handle) = ChannelConnection::new();
    let task = tokio::spawn(bot.run(connection));
    (handle, task)
}

fn say(handle: &ChannelHandle, message: Message) {
    handle.events.send(ConnectionEvent::Message(message)).unwrap();
}

async fn next_line(handle: &mut ChannelHandle) -> Option<String> {
    timeout(Duration::from_millis(500), handle.sent.recv())
        .await
        .ok()
        .flatten()
        .map(|message| message.content)
}

async fn stop(handle: ChannelHandle, task: JoinHandle<Result<(), BotError>>) {
    handle.events.send(ConnectionEvent::Closed).unwrap();
    timeout(Duration::from_secs(1), task)
        .await
        .expect("event loop did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_ping_replies_to_author() {
    init_test_logging();
    let bot = TChatBot::new(config(&["general"])).unwrap();
    let (mut handle, task) = start(bot);

    say(&handle, message("!ping"));
    assert_eq!(next_line(&mut handle).await.as_deref(), Some("@viewer pong"));

    stop(handle, task).await;
}

#[tokio::test]
async fn test_echo_alias_and_cooldown() {
    init_test_logging();
    let bot = TChatBot::new(config(&["general", "moderation"])).unwrap();
    let (mut handle, task) = start(bot);

    say(&handle, message("!say hello   there"));
    assert_eq!(next_line(&mut handle).await.as_deref(), Some("hello there"));

    say(&handle, message("!echo again"));
    assert_eq!(next_line(&mut handle).await, None);

    say(&handle, message_from(moderator(), "!resetcd echo"));
    assert_eq!(
        next_line(&mut handle).await.as_deref(),
        Some("@modperson cooldowns for 'echo' cleared")
    );

    say(&handle, message("!echo again"));
    assert_eq!(next_line(&mut handle).await.as_deref(), Some("again"));

    stop(handle, task).await;
}

#[tokio::test]
async fn test_help_lists_and_describes_commands() {
    init_test_logging();
    let bot = TChatBot::new(config(&["general"])).unwrap();
    let (mut handle, task) = start(bot);

    say(&handle, message("!help"));
    assert_eq!(
        next_line(&mut handle).await.as_deref(),
        Some("@viewer commands: echo, help, ping, uptime")
    );

    say(&handle, message("!help say"));
    assert_eq!(
        next_line(&mut handle).await.as_deref(),
        Some("@viewer !echo [text]: Repeats the given text")
    );

    stop(handle, task).await;
}

#[tokio::test]
async fn test_moderation_commands_require_permission() {
    init_test_logging();
    let bot = TChatBot::new(config(&["general", "moderation"])).unwrap();
    let (mut handle, task) = start(bot);

    say(&handle, message("!resetcd echo"));
    say(&handle, message_from(moderator(), "!reload general"));
    assert_eq!(next_line(&mut handle).await, None);

    say(&handle, message_from(Author::new("Owner"), "!reload general"));
    assert_eq!(
        next_line(&mut handle).await.as_deref(),
        Some("@Owner reloaded 'general'")
    );

    say(&handle, message_from(Author::new("owner"), "!unload nothing"));
    let line = next_line(&mut handle).await.unwrap();
    assert!(line.starts_with("@owner could not change 'nothing'"), "{line}");

    stop(handle, task).await;
}

#[tokio::test]
async fn test_own_messages_are_ignored() {
    init_test_logging();
    let bot = TChatBot::new(config(&["general"])).unwrap();
    let (mut handle, task) = start(bot);

    say(&handle, message_from(Author::new("tchatbot"), "!ping"));
    assert_eq!(next_line(&mut handle).await, None);

    stop(handle, task).await;
}

#[tokio::test]
async fn test_own_messages_are_ignored_regardless_of_case() {
    init_test_logging();
    let mut config = config(&["general"]);
    config.bot.nick = "TChatBot".to_string();
    let bot = TChatBot::new(config).unwrap();
    let (mut handle, task) = start(bot);

    say(&handle, message_from(Author::new("tchatbot"), "!ping"));
    assert_eq!(next_line(&mut handle).await, None);

    say(&handle, message("!ping"));
    assert_eq!(next_line(&mut handle).await.as_deref(), Some("@viewer pong"));

    stop(handle, task).await;
}

#[tokio::test]
async fn test_subscription_notice_publishes_both_events() {
    init_test_logging();
    let bot = TChatBot::new(config(&[])).unwrap();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    for name in ["raw_usernotice", "usernotice_subscription"] {
        let seen_tx = seen_tx.clone();
        bot.bot().listen(name, move |event| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(event.name().to_string());
                Ok(())
            }
        });
    }
    let (handle, task) = start(bot);

    let tags = HashMap::from([("msg-id".to_string(), "resub".to_string())]);
    handle
        .events
        .send(ConnectionEvent::Usernotice {
            channel: test_channel(),
            author: Author::new("loyal").subscriber(),
            tags,
        })
        .unwrap();

    let mut names = Vec::new();
    for _ in 0..2 {
        let name = timeout(Duration::from_millis(500), seen_rx.recv()).await.unwrap().unwrap();
        names.push(name);
    }
    names.sort();
    assert_eq!(names, vec!["raw_usernotice", "usernotice_subscription"]);

    stop(handle, task).await;
}

#[tokio::test]
async fn test_close_publishes_close_event() {
    init_test_logging();
    let bot = TChatBot::new(config(&[])).unwrap();
    let closed = Arc::new(tokio::sync::Notify::new());
    let notify = Arc::clone(&closed);
    bot.bot().listen("close", move |event| {
        let notify = Arc::clone(&notify);
        async move {
            assert!(matches!(event, Event::Close));
            notify.notify_one();
            Ok(())
        }
    });
    let (handle, task) = start(bot);

    stop(handle, task).await;
    timeout(Duration::from_millis(500), closed.notified()).await.unwrap();
}

#[test]
fn test_unknown_enabled_module_fails_startup() {
    init_test_logging();
    let result = TChatBot::new(config(&["missing"]));
    assert!(matches!(result, Err(BotError::Framework(_))));
}
