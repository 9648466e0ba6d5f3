//! Test utilities and shared test helpers for TChat Bot.
//!
//! This module provides common testing utilities, fixtures, and helper functions
//! that can be used across all crates in the workspace for unit and integration testing.

use std::sync::Once;
use tokio::runtime::Runtime;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Create a tokio runtime for testing async functions.
/// This is useful for tests that need to run async code in a synchronous test context.
pub fn create_test_runtime() -> Runtime {
    Runtime::new().expect("Failed to create test runtime")
}

/// Chat message fixtures.
pub mod message_fixtures {
    use crate::{Author, ChannelName, Message};

    /// The channel every fixture message is sent in.
    pub fn test_channel() -> ChannelName {
        ChannelName::new("testchannel")
    }

    /// A chatter without badges.
    pub fn viewer() -> Author {
        Author::new("viewer")
    }

    /// A channel moderator.
    pub fn moderator() -> Author {
        Author::new("modperson").moderator()
    }

    /// The channel owner.
    pub fn broadcaster() -> Author {
        Author::new("testchannel").broadcaster()
    }

    /// A message from [`viewer`] in [`test_channel`].
    pub fn message(content: &str) -> Message {
        Message::new(test_channel(), viewer(), content)
    }

    /// A message from the given author in [`test_channel`].
    pub fn message_from(author: Author, content: &str) -> Message {
        Message::new(test_channel(), author, content)
    }
}

/// Configuration-related test utilities.
pub mod config_fixtures {
    /// Create a minimal valid test configuration as TOML string.
    pub fn minimal_config_toml() -> &'static str {
        r#"
[bot]
nick = "testbot"
token = "oauth:test_token"
prefixes = ["!"]
"#
    }

    /// Create a full test configuration as TOML string.
    pub fn full_config_toml() -> &'static str {
        concat!(
            "[bot]\n",
            "nick = \"testbot\"\n",
            "token = \"oauth:test_token_full\"\n",
            "prefixes = [\"!\", \"?\"]\n",
            "case_insensitive = true\n",
            "initial_channels = [\"testchannel\", \"#OtherChannel\"]\n",
            "owners = [\"ownerperson\"]\n",
            "\n",
            "[modules]\n",
            "enabled = [\"general\", \"moderation\"]\n",
            "\n",
            "[logging]\n",
            "level = \"debug\"\n",
            "format = \"compact\"\n",
            "include_spans = true\n",
        )
    }
}

/// Property-based testing utilities using proptest.
#[cfg(feature = "proptest")]
pub mod property_testing {
    use proptest::prelude::*;

    /// Strategy for bare (unquoted, whitespace-free) command words.
    pub fn word_strategy() -> impl Strategy<Value = String> {
        r#"[a-zA-Z0-9_!?.,:;'-]{1,16}"#.prop_map(|s| s.to_string())
    }

    /// Strategy for phrases that may contain inner spaces but no quotes.
    pub fn phrase_strategy() -> impl Strategy<Value = String> {
        r#"[a-zA-Z0-9 ]{0,24}"#.prop_map(|s| s.to_string())
    }
}
