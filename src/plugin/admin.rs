use crate::{
    context::Context,
    event::*,
    helper::{is_administrator, InteractionHelper},
    log_error, log_internal,
    plugin::{ready::register_commands, Plugin},
};
use anyhow::Result;
use serenity::all::{CreateCommand, Permissions};

/// Re-reads configuration without a restart
pub struct Admin;

#[serenity::async_trait]
impl Plugin for Admin {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/reload - reload configuration and ticket types (administrator only)".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("reload")
            .description("Reload configuration (admin only).")
            .default_member_permissions(Permissions::ADMINISTRATOR)]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_command("reload") else {
            return Ok(EventHandled::No);
        };

        if !is_administrator(command.member.as_deref()) {
            command
                .say_private(ctx, "You don't have permission to use this command.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        command.defer_private(ctx).await?;

        match reload(ctx).await {
            Ok(count) => {
                log_internal!("Configuration reloaded");
                command
                    .follow_up_private(
                        ctx,
                        &format!("Configuration reloaded successfully ({} commands).", count),
                    )
                    .await?;
            }
            Err(e) => {
                log_error!("Could not reload configuration: {}", e);
                command
                    .follow_up_private(ctx, &format!("Error: {}", e))
                    .await?;
            }
        }

        Ok(EventHandled::Yes)
    }
}

async fn reload(ctx: &Context<'_>) -> Result<usize> {
    ctx.cfg.write().await.reload().await?;
    ctx.pstate.write().await.reload().await?;
    // Feature toggles may have changed
    register_commands(ctx).await
}
