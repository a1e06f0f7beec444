//! Parley Discord bot: answers mentions and keywords in guild channels with
//! streamed completions.
//!
//! Each triggering message is turned into a prompt from the user's recent
//! conversation, any image or text attachments, and the replied-to message.
//! The completion is posted as it streams, one finished line or code block at
//! a time.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod attachments;
pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod handler;
pub mod presence;
pub mod sink;
pub mod trigger;

pub use config::DiscordBotConfig;
pub use error::{DiscordBotError, DiscordResult};
