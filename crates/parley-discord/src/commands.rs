//! The `/purgememory` slash command.

use parley_memory::ConversationStore;
use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::model::application::{CommandInteraction, CommandOptionType, ResolvedValue};
use serenity::prelude::Context;
use tracing::{error, info, warn};

use crate::config::DiscordBotConfig;

/// Command name.
pub const PURGE_COMMAND: &str = "purgememory";

/// Slash command definition.
#[must_use]
pub fn purge_command() -> CreateCommand {
    CreateCommand::new(PURGE_COMMAND)
        .description("Clear conversation memory with the bot")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "scope", "What to clear")
                .add_string_choice("Only me", "me")
                .add_string_choice("A specific user (admin only)", "user")
                .add_string_choice("Everyone (admin only)", "all")
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::User,
            "target",
            "User to clear (with scope 'user')",
        ))
}

/// Which conversations a purge removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgePlan {
    /// The invoker's own.
    Own(u64),
    /// Another user's.
    User(u64),
    /// Everyone's.
    All,
}

/// A purge request that cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeDenied {
    /// Scope is not one of `me`, `user`, `all`.
    UnknownScope,
    /// Admin-only scope used by a non-admin.
    NotAllowed,
    /// Scope `user` without a target.
    MissingTarget,
}

impl PurgeDenied {
    /// Reply text.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::UnknownScope => "Unknown scope. Use me, user, or all.",
            Self::NotAllowed => "You are not allowed to use this option.",
            Self::MissingTarget => "Pick a user whose memory should be cleared.",
        }
    }
}

/// Check permissions and resolve what to purge.
pub fn plan_purge(
    scope: &str,
    target: Option<u64>,
    invoker: u64,
    invoker_is_admin: bool,
) -> Result<PurgePlan, PurgeDenied> {
    match scope {
        "me" => Ok(PurgePlan::Own(invoker)),
        "user" if !invoker_is_admin => Err(PurgeDenied::NotAllowed),
        "user" => target.map(PurgePlan::User).ok_or(PurgeDenied::MissingTarget),
        "all" if !invoker_is_admin => Err(PurgeDenied::NotAllowed),
        "all" => Ok(PurgePlan::All),
        _ => Err(PurgeDenied::UnknownScope),
    }
}

/// Run a purge plan and produce the reply text.
pub async fn execute(store: &ConversationStore, plan: PurgePlan) -> String {
    let outcome = match plan {
        PurgePlan::Own(id) | PurgePlan::User(id) => store.purge(&id.to_string()).await.map(|removed| {
            match (plan, removed) {
                (PurgePlan::Own(_), true) => "Your memory with the bot has been cleared.".to_owned(),
                (PurgePlan::Own(_), false) => "You have no memory to clear.".to_owned(),
                (_, true) => format!("Cleared the memory of <@{id}>."),
                (_, false) => format!("<@{id}> has no memory to clear."),
            }
        }),
        PurgePlan::All => store
            .purge_all()
            .await
            .map(|removed| format!("Cleared all bot memory ({removed} users).")),
    };

    outcome.unwrap_or_else(|e| {
        error!(error = %e, ?plan, "purge failed to persist");
        "Memory was cleared but could not be saved.".to_owned()
    })
}

/// Handle an invocation of [`PURGE_COMMAND`].
pub async fn handle_purge(
    ctx: &Context,
    command: &CommandInteraction,
    config: &DiscordBotConfig,
    store: &ConversationStore,
) {
    let mut scope = "";
    let mut target = None;
    for option in command.data.options() {
        match (option.name, option.value) {
            ("scope", ResolvedValue::String(value)) => scope = value,
            ("target", ResolvedValue::User(user, _)) => target = Some(user.id.get()),
            _ => {},
        }
    }

    let invoker = command.user.id.get();
    let reply = match plan_purge(scope, target, invoker, config.is_admin(invoker)) {
        Ok(plan) => {
            info!(invoker, ?plan, "purging memory");
            execute(store, plan).await
        },
        Err(denied) => {
            warn!(invoker, scope, ?denied, "purge refused");
            denied.message().to_owned()
        },
    };

    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(reply)
            .ephemeral(true),
    );
    if let Err(e) = command.create_response(&ctx.http, response).await {
        error!(error = %e, "failed to answer purge command");
    }
}
