//! # TChat Common
//!
//! Shared types, utilities, and common functionality for TChat Bot.
//!
//! This crate provides the chat domain types consumed from the connection
//! layer, the workspace error type, and the structured logging setup used by
//! every other crate in the workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::*;
pub use logging::*;
pub use types::*;
