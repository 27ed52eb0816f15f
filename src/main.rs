mod config;
mod context;
mod duration;
mod error;
mod event;
mod handler;
mod helper;
mod logging;
mod persistent_state;
mod plugin;
mod session;
mod surface;
mod volatile_state;

use serenity::{all::GatewayIntents, Client};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let pstate = crate::persistent_state::PersistentState::load().await?;
    let vstate = Arc::new(RwLock::new(
        crate::volatile_state::VolatileState::new().await,
    ));
    let handler = handler::Handler::new(cfg, pstate, Arc::clone(&vstate));

    // Things we want discord to tell us about.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await?;

    // Sessions' refresh tasks outlive the gateway unless stopped
    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log_internal!("Shutting down");
                vstate.read().await.shutdown().await;
                shard_manager.shutdown_all().await;
            }
            Err(e) => log_error!("Could not listen for Ctrl+C: {}", e),
        }
    });

    client.start().await.map_err(Into::into)
}
