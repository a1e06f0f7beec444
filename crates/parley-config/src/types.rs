//! Configuration types for the Parley relay.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header in TOML produces a working
//! configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion endpoint and request shaping.
    pub llm: LlmSection,
    /// Rolling conversation window persistence.
    pub memory: MemorySection,
    /// Attachment encoding limits.
    pub attachments: AttachmentsSection,
    /// Discord frontend settings.
    pub discord: DiscordSection,
}

// ---------------------------------------------------------------------------
// LlmSection
// ---------------------------------------------------------------------------

/// Completion endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Full URL of the chat-completions endpoint.
    pub endpoint_url: String,
    /// Bearer token. A missing key is reported per call, not at load time.
    pub api_key: Option<String>,
    /// Model identifier sent in the request body.
    pub model: String,
    /// `max_tokens` sent in the request body.
    pub max_tokens: u32,
    /// Overall timeout for one streaming request, in seconds.
    pub timeout_secs: u64,
    /// System prompt prepended to every request (skipped when blank).
    pub system_prompt: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            endpoint_url: "https://api.openai.com/v1/chat/completions".to_owned(),
            api_key: None,
            model: "gpt-4o".to_owned(),
            max_tokens: 4096,
            timeout_secs: 300,
            system_prompt: String::new(),
        }
    }
}

impl std::fmt::Debug for LlmSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSection")
            .field("endpoint_url", &self.endpoint_url)
            .field("has_api_key", &self.api_key.as_ref().is_some_and(|k| !k.is_empty()))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("system_prompt_len", &self.system_prompt.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// MemorySection
// ---------------------------------------------------------------------------

/// Conversation window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// JSON file the whole conversation map is written to.
    pub path: String,
    /// Maximum turns kept per user.
    pub max_turns: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            path: "chat_memory.json".to_owned(),
            max_turns: 6,
        }
    }
}

// ---------------------------------------------------------------------------
// AttachmentsSection
// ---------------------------------------------------------------------------

/// Attachment encoding limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsSection {
    /// Largest attachment (declared or actual) that will be read.
    pub max_bytes: u64,
    /// Number of encoded images kept in the LRU cache.
    pub cache_capacity: usize,
}

impl Default for AttachmentsSection {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            cache_capacity: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// DiscordSection
// ---------------------------------------------------------------------------

/// Discord frontend settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    /// Bot token from the Discord developer portal.
    pub bot_token: Option<String>,
    /// Users allowed to purge other users' memory or the whole store.
    pub admin_user_ids: Vec<u64>,
    /// Case-insensitive keywords that trigger a reply without a mention.
    pub trigger_keywords: Vec<String>,
    /// JSON file holding the presence titles.
    pub status_file: String,
    /// Seconds between presence changes.
    pub status_interval_secs: u64,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_user_ids: Vec::new(),
            trigger_keywords: Vec::new(),
            status_file: "games.json".to_owned(),
            status_interval_secs: 3600,
        }
    }
}

impl DiscordSection {
    /// Check whether a user may run administrative purges.
    #[must_use]
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

impl std::fmt::Debug for DiscordSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSection")
            .field("bot_token", &"[REDACTED]")
            .field("admin_user_ids", &self.admin_user_ids)
            .field("trigger_keywords", &self.trigger_keywords)
            .field("status_file", &self.status_file)
            .field("status_interval_secs", &self.status_interval_secs)
            .finish()
    }
}
