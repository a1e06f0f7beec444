//! Client setup and the gateway run loop.

use std::sync::Arc;

use parley_llm::CompletionClient;
use parley_memory::{AttachmentEncoder, ConversationStore};
use parley_render::StreamingRenderer;
use serenity::Client;
use serenity::model::gateway::GatewayIntents;
use tracing::{info, warn};

use crate::config::DiscordBotConfig;
use crate::error::DiscordResult;
use crate::handler::{BotState, Handler};
use crate::presence::load_statuses;

/// Build the shared state from a config.
///
/// # Errors
///
/// Fails if the conversation file cannot be opened.
pub fn build_state(config: DiscordBotConfig) -> DiscordResult<BotState> {
    if config.api_key.is_none() {
        warn!(
            endpoint = %config.endpoint_url,
            "no completion API key configured; only local endpoints will accept requests"
        );
    }
    if config.admin_user_ids.is_empty() {
        warn!("no admin users configured; only self-purge is available");
    }

    let client = CompletionClient::new(
        &config.endpoint_url,
        config.api_key.as_deref(),
        &config.model,
    )
    .with_max_tokens(config.max_tokens)
    .with_timeout(config.request_timeout);

    let store = ConversationStore::open(&config.memory_path, config.max_turns)?;
    let encoder =
        AttachmentEncoder::new(config.image_cache_capacity, config.max_attachment_bytes);
    let statuses = load_statuses(&config.status_file);

    Ok(BotState {
        renderer: StreamingRenderer::new(client),
        store,
        encoder,
        statuses,
        config,
    })
}

/// Run the bot until the gateway closes or Ctrl+C.
///
/// # Errors
///
/// Fails if state cannot be built or the Discord client fails to start.
pub async fn run(config: DiscordBotConfig) -> DiscordResult<()> {
    let token = config.bot_token.clone();
    let state = build_state(config)?;
    info!(
        model = %state.config.model,
        memory = %state.store.path().display(),
        "starting Discord bot"
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler::new(Arc::new(state)))
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await?;
    Ok(())
}
