use crate::{
    context::Context,
    event::*,
    helper::{CommandOptions, InteractionHelper},
    log_error, log_internal,
    logging::AsyncPrintColor,
    plugin::Plugin,
};
use anyhow::Result;
use serenity::all::{CommandOptionType, CreateCommand, CreateCommandOption, Permissions};

/// Keeps a moderator's note as the newest message of a channel
pub struct StickyNote;

#[serenity::async_trait]
impl Plugin for StickyNote {
    fn name(&self) -> &'static str {
        "sticky_note"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(
            "/stickynote <content> - pin a note to the bottom of this channel\n\
             /clearnote - remove this channel's sticky note"
                .to_owned(),
        )
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![
            CreateCommand::new("stickynote")
                .description("Set a sticky note in this channel.")
                .default_member_permissions(Permissions::MANAGE_MESSAGES)
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "content",
                        "The sticky note content",
                    )
                    .required(true),
                ),
            CreateCommand::new("clearnote")
                .description("Clear the sticky note in this channel.")
                .default_member_permissions(Permissions::MANAGE_MESSAGES),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        // The lock is per channel; don't hold the state across the HTTP calls
        let notes = ctx.vstate.read().await.sticky_notes.clone();

        if let Event::Message(msg) = event {
            notes.on_message(msg.channel_id, &**ctx.http).await;
            return Ok(EventHandled::No);
        }

        if let Some(command) = event.is_command("stickynote") {
            let content = command.str_option("content").unwrap_or_default().to_owned();

            command.say_private(ctx, "Sticky note set!").await?;
            if let Err(e) = notes.set(command.channel_id, content, &**ctx.http).await {
                log_error!("Could not post sticky note: {}", e);
            }
            log_internal!("Sticky note set in {}", command.channel_id.color(ctx.http).await);
            return Ok(EventHandled::Yes);
        }

        if let Some(command) = event.is_command("clearnote") {
            let reply = if notes.clear(command.channel_id, &**ctx.http).await {
                log_internal!(
                    "Sticky note cleared in {}",
                    command.channel_id.color(ctx.http).await
                );
                "Sticky note cleared!"
            } else {
                "No sticky note set in this channel."
            };
            command.say_private(ctx, reply).await?;
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}
