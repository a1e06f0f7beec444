//! Parley Discord bot binary.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn,parley_discord=info,parley_render=info,parley_memory=info")
        }))
        .init();

    let workspace = std::env::current_dir()?;
    let config = parley_discord::DiscordBotConfig::load(Some(&workspace))?;
    Box::pin(parley_discord::bot::run(config)).await?;
    Ok(())
}
