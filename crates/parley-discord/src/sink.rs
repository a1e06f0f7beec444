//! Posting rendered chunks to a Discord channel.

use std::sync::Arc;

use async_trait::async_trait;
use parley_render::{ChunkSink, SinkError};
use serenity::http::Http;
use serenity::model::id::ChannelId;
use tracing::debug;

use crate::format::{DISCORD_MAX_LEN, chunk_discord, sanitize_for_discord};

/// Sends each chunk as one or more channel messages.
pub struct ChannelSink {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelSink {
    /// Create a sink for `channel_id`.
    #[must_use]
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn send(&self, chunk: &str) -> Result<(), SinkError> {
        let safe = sanitize_for_discord(chunk);
        for piece in chunk_discord(&safe, DISCORD_MAX_LEN) {
            if piece.trim().is_empty() {
                continue;
            }
            self.channel_id
                .say(&self.http, piece)
                .await
                .map_err(|e| SinkError::Delivery(e.to_string()))?;
        }
        debug!(channel_id = %self.channel_id, len = chunk.len(), "posted chunk");
        Ok(())
    }
}
