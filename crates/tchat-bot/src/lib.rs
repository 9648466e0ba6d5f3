//! # TChat Bot
//!
//! Chat bot binary built on the TChat command framework.
//!
//! This crate wires configuration, logging and a connection into a
//! [`tchat_commands::Bot`], ships the built-in modules, and runs the event
//! loop that turns connection events into bot events and queued replies into
//! outbound chat lines.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod connection;
pub mod error;
pub mod modules;

pub use bot::*;
pub use connection::*;
pub use error::*;
