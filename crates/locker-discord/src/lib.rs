//! Discord gateway adapter for the locker runtime.
//!
//! Owns the serenity client, converts gateway events into locker events and
//! executes the runtime's effects over the REST API.

mod discord_convert;
mod discord_effects;
mod discord_gateway;
mod discord_handler;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use locker_catch::MemberDirectory;
use locker_core::EffectSink;
use locker_runtime::{ChannelHistory, LockerConfig, LockerRuntime};
use serenity::all as discord;

pub use discord_gateway::DiscordGateway;
pub use discord_handler::{gateway_intents, LockerHandler};

/// Connects with `token` and serves events until the gateway stops or the
/// process receives ctrl-c.
pub async fn run_discord_bot(config: LockerConfig, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("bot token cannot be empty");
    }

    let http = Arc::new(discord::Http::new(token));
    let gateway = Arc::new(DiscordGateway::new(Arc::clone(&http)));
    let (effects, effect_rx) = EffectSink::channel();
    let runtime = Arc::new(LockerRuntime::new(
        config,
        effects,
        Arc::clone(&gateway) as Arc<dyn MemberDirectory>,
        Arc::clone(&gateway) as Arc<dyn ChannelHistory>,
    )?);
    let worker =
        discord_effects::spawn_effect_worker(effect_rx, Arc::clone(&http), Arc::clone(&runtime));

    let mut client = discord::Client::builder(token, gateway_intents())
        .event_handler(LockerHandler::new(Arc::clone(&runtime), gateway))
        .await
        .context("failed to build discord client")?;
    let shard_manager = Arc::clone(&client.shard_manager);

    let outcome = tokio::select! {
        result = client.start() => result.context("discord client stopped"),
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            signal.context("failed to listen for shutdown signal")
        }
    };
    shard_manager.shutdown_all().await;
    runtime.shutdown().await;
    worker.abort();
    tracing::info!("locker stopped");
    outcome
}
