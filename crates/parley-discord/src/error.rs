//! Error types for the Discord frontend.

use thiserror::Error;

/// Errors that stop the bot or a handler.
#[derive(Debug, Error)]
pub enum DiscordBotError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file loading failed.
    #[error(transparent)]
    ConfigLoad(#[from] parley_config::ConfigError),

    /// The conversation store failed.
    #[error(transparent)]
    Memory(#[from] parley_memory::MemoryError),

    /// The Discord client failed.
    #[error("discord error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Result type for the Discord frontend.
pub type DiscordResult<T> = Result<T, DiscordBotError>;
