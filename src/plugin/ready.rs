use crate::{context::Context, event::*, log_error, log_internal, plugin::Plugin};
use anyhow::Result;
use serenity::all::Command;

/// Registers slash commands once the connection to Discord is ready.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready(_) = event else {
            return Ok(EventHandled::No);
        };

        // Commands live on the guild only
        if let Err(e) = Command::set_global_commands(ctx.http, Vec::new()).await {
            log_error!("Could not clear global commands: {}", e);
        }

        register_commands(ctx).await?;

        // Connected to server
        Ok(EventHandled::Yes)
    }
}

/// Replace the guild's slash commands with those of every enabled plugin
pub async fn register_commands(ctx: &Context<'_>) -> Result<usize> {
    let mut commands = Vec::new();
    for plugin in crate::plugin::enabled_plugins(ctx).await {
        commands.extend(plugin.commands());
    }

    let guild_id = ctx.guild_id().await;
    let registered = guild_id.set_commands(ctx.http, commands).await?;

    log_internal!(
        "Registered {} command(s) with guild {}",
        registered.len(),
        guild_id
    );

    Ok(registered.len())
}
