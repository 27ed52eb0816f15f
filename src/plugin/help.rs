use crate::{context::Context, event::*, helper::InteractionHelper, plugin::Plugin};
use anyhow::Result;
use serenity::all::{CreateCommand, CreateEmbed, CreateEmbedFooter, Permissions};

pub struct Help;

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/help - show this help message".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("help")
            .description("Shows all available commands and their descriptions.")
            .default_member_permissions(Permissions::MANAGE_MESSAGES)]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_command("help") else {
            return Ok(EventHandled::No);
        };

        let mut lines = Vec::new();
        for plugin in crate::plugin::enabled_plugins(ctx).await {
            if let Some(usage) = plugin.usage(ctx).await {
                lines.push(usage);
            }
        }

        let embed = CreateEmbed::new()
            .title("Help Menu")
            .description(format!(
                "Here's a list of available commands:\n\n{}",
                lines.join("\n")
            ))
            .color(ctx.embed_color().await)
            .footer(CreateEmbedFooter::new(format!(
                "Requested by {}",
                command.user.name
            )));

        command.embed_private(ctx, embed).await?;
        Ok(EventHandled::Yes)
    }
}
