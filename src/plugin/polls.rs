use crate::{
    context::Context,
    duration::parse_duration,
    error::Error,
    event::*,
    helper::{is_moderator, CommandOptions, InteractionHelper},
    log_error,
    plugin::Plugin,
    session::{
        self,
        poll::{Poll, Vote, MAX_OPTIONS},
        Actor, Session, SessionId,
    },
};
use anyhow::Result;
use serenity::all::{
    CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption,
    CreateInteractionResponse,
};
use std::sync::Arc;
use tokio::time::Instant;

const DEFAULT_DURATION: &str = "1m";

/// Timed single-choice polls with live tallies
pub struct Polls;

/// `(label, link)` for every option slot, blank slots included
fn option_slots(command: &CommandInteraction) -> Vec<(String, Option<String>)> {
    (1..=MAX_OPTIONS)
        .map(|slot| {
            let label = command
                .str_option(&format!("option{}", slot))
                .unwrap_or_default()
                .to_owned();
            let link = command
                .str_option(&format!("option{}_link", slot))
                .map(str::to_owned);
            (label, link)
        })
        .collect()
}

#[serenity::async_trait]
impl Plugin for Polls {
    fn name(&self) -> &'static str {
        "polls"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/poll <question> <option1> <option2> [option3..5] [links] [duration] - create a poll".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        let mut command = CreateCommand::new("poll")
            .description("Create a button-based poll")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "question", "The poll question")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "option1", "First option")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "option2", "Second option")
                    .required(true),
            );

        // Discord wants the required options first
        for slot in 1..=MAX_OPTIONS {
            if slot > 2 {
                command = command.add_option(CreateCommandOption::new(
                    CommandOptionType::String,
                    format!("option{}", slot),
                    format!("Option {} (optional)", slot),
                ));
            }
            command = command.add_option(CreateCommandOption::new(
                CommandOptionType::String,
                format!("option{}_link", slot),
                format!("Optional link for option {}", slot),
            ));
        }

        vec![command.add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "duration",
            "Poll duration (e.g. 1m, 10m, 2h, 3d)",
        ))]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some(command) = event.is_command("poll") {
            let (only_moderators, community, color) = {
                let cfg = ctx.cfg.read().await;
                (
                    cfg.polls.only_moderators,
                    cfg.general.community_name.clone(),
                    cfg.general.embed_color,
                )
            };

            if only_moderators && !is_moderator(command.member.as_deref()) {
                let refused = Error::NotPermitted(
                    "Only admins or moderators can create polls on this server.".to_owned(),
                );
                command.say_private(ctx, &refused.to_string()).await?;
                return Ok(EventHandled::Yes);
            }

            let duration = command.str_option("duration").unwrap_or(DEFAULT_DURATION);
            let poll = parse_duration(duration).and_then(|secs| {
                Poll::new(
                    format!("{} Poll", community),
                    command.str_option("question").unwrap_or_default(),
                    command.user.display_name(),
                    option_slots(command),
                    color,
                )
                .map(|poll| (secs, poll))
            });
            let (secs, poll) = match poll {
                Ok(parsed) => parsed,
                Err(e) => {
                    command.say_private(ctx, &e.to_string()).await?;
                    return Ok(EventHandled::Yes);
                }
            };

            let registry = ctx.vstate.read().await.polls.clone();
            let session = Session::new(command.user.id, secs, Instant::now(), poll);
            if let Err(e) =
                session::launch(&registry, session, command.channel_id, Arc::clone(ctx.http)).await
            {
                log_error!("Could not post poll in {}: {}", command.channel_id, e);
                command
                    .say_private(ctx, "Could not post the poll in this channel.")
                    .await?;
                return Ok(EventHandled::Yes);
            }

            command.say_private(ctx, "Poll created!").await?;
            return Ok(EventHandled::Yes);
        }

        if let Some((component, id)) = event.is_component("poll") {
            if id.action != "vote" {
                return Ok(EventHandled::No);
            }
            let (Some(session_id), Some(option)) =
                (id.arg::<SessionId>(0), id.arg::<usize>(1))
            else {
                return Ok(EventHandled::No);
            };

            let actor = Actor {
                id: component.user.id,
                bot: component.user.bot,
            };
            let registry = ctx.vstate.read().await.polls.clone();
            match session::participate(&registry, session_id, actor, Vote(option), &**ctx.http).await {
                // The updated tallies are the acknowledgement
                Ok(()) => {
                    component
                        .respond(ctx, CreateInteractionResponse::Acknowledge)
                        .await?
                }
                Err(e) => component.say_private(ctx, &e.to_string()).await?,
            }
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}
