use crate::{context::Context, event::*, log_event, logging::*, plugin::Plugin};
use anyhow::Result;
use serenity::all::ComponentInteractionDataKind;

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ctx.cache.current_user().color(),
                );
            }
            Event::Message(msg) => {
                log_event!(
                    "{}{}{}{}{}{} {}",
                    msg.guild_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.author.color(),
                    Glue {}.color(),
                    msg.content,
                );
            }
            Event::Command(command) => {
                log_event!(
                    "{} used /{} in \"{}\"",
                    command.user.color(),
                    command.data.name,
                    command.channel_id.color(ctx.http).await,
                );
            }
            Event::Component(component) => {
                let values = match &component.data.kind {
                    ComponentInteractionDataKind::StringSelect { values } => values.join(", "),
                    ComponentInteractionDataKind::RoleSelect { values } => values
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                    _ => String::new(),
                };
                log_event!(
                    "{} pressed \"{}\" {}",
                    component.user.color(),
                    component.data.custom_id,
                    values,
                );
            }
            Event::Modal(modal) => {
                log_event!(
                    "{} submitted \"{}\"",
                    modal.user.color(),
                    modal.data.custom_id,
                );
            }
            Event::MemberJoin(member) => {
                log_event!(
                    "{} joined {}",
                    member.user.color(),
                    Some(member.guild_id).color(ctx.http).await,
                );
            }
        }

        Ok(EventHandled::No)
    }
}
