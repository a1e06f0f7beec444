//! Configuration for the Discord bot.
//!
//! Loads settings from the layered Parley config (`~/.parley/config.toml`,
//! `{workspace}/.parley/config.toml`) with environment variable fallbacks
//! (`DISCORD_TOKEN`, `OPENAI_API_KEY`, `PARLEY_*`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use parley_config::Config;
use tracing::debug;

use crate::error::{DiscordBotError, DiscordResult};

/// Everything the bot needs at runtime.
#[derive(Clone)]
pub struct DiscordBotConfig {
    /// Discord bot token.
    pub bot_token: String,
    /// Full chat-completions endpoint URL.
    pub endpoint_url: String,
    /// Completion API key; `None` is reported per request.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Completion budget per request.
    pub max_tokens: u32,
    /// End-to-end request timeout.
    pub request_timeout: Duration,
    /// System prompt prepended to every request (blank to omit).
    pub system_prompt: String,
    /// Conversation file.
    pub memory_path: PathBuf,
    /// Turns kept per user.
    pub max_turns: usize,
    /// Attachment size ceiling in bytes.
    pub max_attachment_bytes: u64,
    /// Encoded images kept in memory.
    pub image_cache_capacity: usize,
    /// Users allowed to purge other users' or all conversations.
    pub admin_user_ids: Vec<u64>,
    /// Lowercase words that trigger a response without a mention.
    pub trigger_keywords: Vec<String>,
    /// Presence status file.
    pub status_file: PathBuf,
    /// Time between presence changes.
    pub status_interval: Duration,
}

impl std::fmt::Debug for DiscordBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordBotConfig")
            .field("bot_token", &"[REDACTED]")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("memory_path", &self.memory_path)
            .field("max_turns", &self.max_turns)
            .field("admin_user_ids", &self.admin_user_ids)
            .field("trigger_keywords", &self.trigger_keywords)
            .field("status_file", &self.status_file)
            .field("status_interval", &self.status_interval)
            .finish_non_exhaustive()
    }
}

impl DiscordBotConfig {
    /// Load from the layered config files and environment.
    ///
    /// # Errors
    ///
    /// Fails if a config file is malformed or invalid, or if no bot token is
    /// configured.
    pub fn load(workspace_root: Option<&Path>) -> DiscordResult<Self> {
        let resolved = Config::load(workspace_root)?;
        debug!(files = ?resolved.loaded_files, "loaded config from files");
        Self::from_config(resolved.config)
    }

    /// Build from an already-loaded [`Config`].
    ///
    /// # Errors
    ///
    /// Fails if no bot token is configured.
    pub fn from_config(config: Config) -> DiscordResult<Self> {
        let bot_token = config
            .discord
            .bot_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DiscordBotError::Config(
                    "bot_token is required; set [discord] bot_token in \
                     ~/.parley/config.toml or the DISCORD_TOKEN env var"
                        .to_owned(),
                )
            })?;

        let trigger_keywords = config
            .discord
            .trigger_keywords
            .iter()
            .map(|kw| kw.trim().to_lowercase())
            .filter(|kw| !kw.is_empty())
            .collect();

        Ok(Self {
            bot_token,
            endpoint_url: config.llm.endpoint_url,
            api_key: config.llm.api_key.filter(|k| !k.trim().is_empty()),
            model: config.llm.model,
            max_tokens: config.llm.max_tokens,
            request_timeout: Duration::from_secs(config.llm.timeout_secs),
            system_prompt: config.llm.system_prompt,
            memory_path: PathBuf::from(config.memory.path),
            max_turns: config.memory.max_turns,
            max_attachment_bytes: config.attachments.max_bytes,
            image_cache_capacity: config.attachments.cache_capacity,
            admin_user_ids: config.discord.admin_user_ids,
            trigger_keywords,
            status_file: PathBuf::from(config.discord.status_file),
            status_interval: Duration::from_secs(config.discord.status_interval_secs),
        })
    }

    /// Whether `user_id` may run admin-only purges.
    #[must_use]
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token() -> Config {
        let mut config = Config::default();
        config.discord.bot_token = Some("tok".to_owned());
        config
    }

    #[test]
    fn missing_token_is_config_error() {
        let err = DiscordBotConfig::from_config(Config::default()).unwrap_err();
        assert!(matches!(err, DiscordBotError::Config(_)));

        let mut blank = Config::default();
        blank.discord.bot_token = Some("  ".to_owned());
        assert!(DiscordBotConfig::from_config(blank).is_err());
    }

    #[test]
    fn keywords_are_normalized() {
        let mut config = config_with_token();
        config.discord.trigger_keywords = vec![" Parley ".to_owned(), String::new(), "BOT".to_owned()];
        let bot = DiscordBotConfig::from_config(config).unwrap();
        assert_eq!(bot.trigger_keywords, vec!["parley".to_owned(), "bot".to_owned()]);
    }

    #[test]
    fn admin_check() {
        let mut config = config_with_token();
        config.discord.admin_user_ids = vec![7];
        let bot = DiscordBotConfig::from_config(config).unwrap();
        assert!(bot.is_admin(7));
        assert!(!bot.is_admin(8));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = config_with_token();
        config.llm.api_key = Some("sk-secret".to_owned());
        let bot = DiscordBotConfig::from_config(config).unwrap();
        let debug = format!("{bot:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("tok\""));
    }
}
