use crate::{
    context::Context,
    duration::parse_duration,
    event::*,
    helper::{CommandOptions, InteractionHelper},
    log_error,
    plugin::Plugin,
    session::{
        self,
        giveaway::{Giveaway, GiveawayAction},
        Actor, Session, SessionId,
    },
};
use anyhow::Result;
use serenity::all::{
    ChannelType, CommandOptionType, CreateCommand, CreateCommandOption, Permissions,
};
use std::sync::Arc;
use tokio::time::Instant;

/// Timed giveaways with enter/leave buttons and a random draw at expiry
pub struct Giveaways;

#[serenity::async_trait]
impl Plugin for Giveaways {
    fn name(&self) -> &'static str {
        "giveaways"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(
            "/giveaway <channel> <prize> <duration> [winners] [prize_link] - start a giveaway"
                .to_owned(),
        )
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("giveaway")
            .description("Start a giveaway")
            .default_member_permissions(Permissions::MANAGE_MESSAGES)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "Channel to post the giveaway in",
                )
                .channel_types(vec![ChannelType::Text])
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "prize", "What is being given away")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "duration",
                    "Duration (e.g. 10m, 2h, 1d)",
                )
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::Integer,
                "winners",
                "Number of winners (default 1)",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "prize_link",
                "Optional link for the prize",
            ))]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some(command) = event.is_command("giveaway") {
            let (Some(channel_id), Some(prize), Some(duration)) = (
                command.channel_option("channel"),
                command.str_option("prize"),
                command.str_option("duration"),
            ) else {
                command
                    .say_private(ctx, "A channel, prize and duration are required.")
                    .await?;
                return Ok(EventHandled::Yes);
            };

            let color = ctx.embed_color().await;
            let giveaway = parse_duration(duration).and_then(|secs| {
                Giveaway::new(
                    command.user.id,
                    prize,
                    command.str_option("prize_link").map(str::to_owned),
                    command.int_option("winners").unwrap_or(1),
                    color,
                )
                .map(|giveaway| (secs, giveaway))
            });
            let (secs, giveaway) = match giveaway {
                Ok(parsed) => parsed,
                Err(e) => {
                    command.say_private(ctx, &e.to_string()).await?;
                    return Ok(EventHandled::Yes);
                }
            };

            let registry = ctx.vstate.read().await.giveaways.clone();
            let session = Session::new(command.user.id, secs, Instant::now(), giveaway);
            if let Err(e) = session::launch(&registry, session, channel_id, Arc::clone(ctx.http)).await {
                log_error!("Could not post giveaway in {}: {}", channel_id, e);
                command
                    .say_private(ctx, &format!("Could not post the giveaway in <#{}>.", channel_id))
                    .await?;
                return Ok(EventHandled::Yes);
            }

            command
                .say_private(
                    ctx,
                    &format!("Giveaway for **{}** started in <#{}>!", prize, channel_id),
                )
                .await?;
            return Ok(EventHandled::Yes);
        }

        if let Some((component, id)) = event.is_component("giveaway") {
            let action = match id.action {
                "enter" => GiveawayAction::Enter,
                "leave" => GiveawayAction::Leave,
                _ => return Ok(EventHandled::No),
            };
            let Some(session_id) = id.arg::<SessionId>(0) else {
                return Ok(EventHandled::No);
            };

            let actor = Actor {
                id: component.user.id,
                bot: component.user.bot,
            };
            let registry = ctx.vstate.read().await.giveaways.clone();
            let reply = match session::participate(&registry, session_id, actor, action, &**ctx.http).await {
                Ok(ack) => ack.message().to_owned(),
                Err(e) => e.to_string(),
            };
            component.say_private(ctx, &reply).await?;
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}
