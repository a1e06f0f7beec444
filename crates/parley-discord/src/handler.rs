//! Gateway event handling: messages, slash commands, and readiness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context as _;
use parley_llm::{CompletionClient, Role};
use parley_memory::{AttachmentEncoder, ConversationStore};
use parley_render::StreamingRenderer;
use parley_render::prompt::{assemble, memory_message};
use serenity::async_trait;
use serenity::model::application::{Command, Interaction};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, error, info, warn};

use crate::attachments::{encode_images, read_documents};
use crate::commands::{PURGE_COMMAND, handle_purge, purge_command};
use crate::config::DiscordBotConfig;
use crate::presence::{GameStatus, spawn_rotation};
use crate::sink::ChannelSink;
use crate::trigger::{MessageFacts, RepliedMessage, Trigger, decide, strip_mention};

/// Shared state for all handlers.
pub struct BotState {
    /// Bot configuration.
    pub config: DiscordBotConfig,
    /// Completion renderer.
    pub renderer: StreamingRenderer<CompletionClient>,
    /// Per-user conversation windows.
    pub store: ConversationStore,
    /// Image attachment encoder.
    pub encoder: AttachmentEncoder,
    /// Presence titles.
    pub statuses: Vec<GameStatus>,
}

/// Serenity event handler.
pub struct Handler {
    state: Arc<BotState>,
    presence_started: AtomicBool,
}

impl Handler {
    /// Create a handler over shared state.
    #[must_use]
    pub fn new(state: Arc<BotState>) -> Self {
        Self {
            state,
            presence_started: AtomicBool::new(false),
        }
    }

    async fn handle_message(&self, ctx: &Context, msg: &Message) -> anyhow::Result<()> {
        let bot_id = ctx.cache.current_user().id;
        let replied = replied_message(ctx, msg).await;
        let replied_author = replied.as_ref().map(display_name);

        let facts = MessageFacts {
            content: &msg.content,
            mentions_bot: msg.mentions_user_id(bot_id),
            reply_to: replied
                .as_ref()
                .zip(replied_author.as_deref())
                .map(|(m, author)| RepliedMessage {
                    by_bot: m.author.id == bot_id,
                    author,
                    content: &m.content,
                }),
        };

        let Some(trigger) = decide(&facts, &self.state.config.trigger_keywords) else {
            return Ok(());
        };
        debug!(message_id = %msg.id, ?trigger, "answering message");

        let typing = msg.channel_id.start_typing(&ctx.http);
        let result = self.respond(ctx, msg, bot_id, &trigger).await;
        typing.stop();
        result
    }

    async fn respond(
        &self,
        ctx: &Context,
        msg: &Message,
        bot_id: UserId,
        trigger: &Trigger,
    ) -> anyhow::Result<()> {
        let state = &self.state;
        let author = display_name(msg);
        let user_id = msg.author.id.to_string();

        let images = encode_images(&state.encoder, &msg.attachments).await;
        let documents = read_documents(&msg.attachments, state.config.max_attachment_bytes).await;
        let body = format!("{}{documents}", strip_mention(&msg.content, bot_id.get()));
        let user_text = trigger.user_text(&author, &body);

        let history = state.store.read(&user_id);
        state
            .store
            .append(&user_id, &author, &memory_message(&user_text, &images.names), Role::User)
            .await
            .context("failed to record user turn")?;

        let turns = assemble(
            &state.config.system_prompt,
            &history,
            &author,
            &user_text,
            &images.uris,
        );
        let sink = ChannelSink::new(Arc::clone(&ctx.http), msg.channel_id);
        let answer = state.renderer.render(&turns, &sink).await;

        if answer.is_empty() {
            warn!(user_id = %user_id, "no answer produced; user turn left unanswered");
            return Ok(());
        }

        state
            .store
            .append(&user_id, &author, &answer, Role::Assistant)
            .await
            .context("failed to record assistant turn")?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.guild_id.is_none() {
            return;
        }
        if let Err(e) = self.handle_message(&ctx, &msg).await {
            error!(message_id = %msg.id, error = %format!("{e:#}"), "failed to handle message");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        if command.data.name == PURGE_COMMAND {
            handle_purge(&ctx, &command, &self.state.config, &self.state.store).await;
        } else {
            debug!(name = %command.data.name, "ignoring unknown command");
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to Discord");

        match Command::set_global_commands(&ctx.http, vec![purge_command()]).await {
            Ok(commands) => info!(count = commands.len(), "slash commands registered"),
            Err(e) => error!(error = %e, "failed to register slash commands"),
        }

        // Reconnects fire `ready` again; rotate only once.
        if !self.presence_started.swap(true, Ordering::SeqCst) {
            spawn_rotation(
                ctx.clone(),
                self.state.statuses.clone(),
                self.state.config.status_interval,
            );
        }
    }
}

/// Server nickname, else global display name, else username.
fn display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .unwrap_or_else(|| msg.author.display_name().to_owned())
}

/// The message `msg` replies to, from the payload or fetched.
async fn replied_message(ctx: &Context, msg: &Message) -> Option<Message> {
    if let Some(replied) = &msg.referenced_message {
        return Some((**replied).clone());
    }
    let message_id = msg.message_reference.as_ref()?.message_id?;
    match msg.channel_id.message(&ctx.http, message_id).await {
        Ok(replied) => Some(replied),
        Err(e) => {
            warn!(message_id = %message_id, error = %e, "failed to fetch replied-to message");
            None
        },
    }
}
