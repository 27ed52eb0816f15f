use crate::{context::Context, event::*, plugin::Plugin};
use anyhow::Result;

/// Messages from bots, the sticky notes included, and direct messages go no further
pub struct IgnoreBots;

#[serenity::async_trait]
impl Plugin for IgnoreBots {
    fn name(&self) -> &'static str {
        "ignore_bots"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, _ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        match msg.guild_id {
            Some(_) if !msg.author.bot => Ok(EventHandled::No),
            _ => Ok(EventHandled::Yes),
        }
    }
}
