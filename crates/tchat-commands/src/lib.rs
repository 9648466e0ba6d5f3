//! # TChat Commands
//!
//! Command resolution, invocation pipeline, and event dispatch for TChat Bot.
//!
//! This crate turns inbound chat messages into command invocations: prefix
//! matching, tokenizing, alias resolution, argument binding, check and
//! cooldown gating, and hooks around the callback. It also runs the named
//! event bus that fans protocol events out to subscribers, and tracks which
//! commands and listeners each cog and module owns.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod args;
pub mod bot;
pub mod checks;
pub mod cog;
pub mod command;
pub mod context;
pub mod cooldown;
pub mod error;
pub mod events;
pub mod module;
pub mod prefix;
pub mod registry;
pub mod tokenizer;

pub use args::{ArgType, ArgValue, Args, Param, ParamKind};
pub use bot::{Bot, BotBuilder};
pub use checks::{Check, Permission};
pub use cog::Cog;
pub use command::{hook, Command, CommandHandler, Hook};
pub use context::{Context, OutboundMessage};
pub use cooldown::{BucketType, Cooldown, CooldownManager};
pub use error::*;
pub use events::{callback, Callback, DefaultEventHandler, Event, EventBus, EventHandler, Listener};
pub use module::{Module, ModuleFactory, ModuleManager, ModuleRecord};
pub use prefix::{Prefix, PrefixValue};
pub use registry::Registry;
pub use tokenizer::{tokenize, ParseError};

pub use tchat_common::{Author, BoxError, ChannelName, Message};
