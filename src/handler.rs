use crate::{
    config::Config, context::Context, event::Event, persistent_state::PersistentState,
    volatile_state::VolatileState,
};
use serenity::all::{Interaction, Member, Message, Ready};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discord event handler
pub struct Handler {
    cfg: RwLock<Config>,
    pstate: RwLock<PersistentState>,
    vstate: Arc<RwLock<VolatileState>>,
}

impl<'a> Handler {
    pub fn new(cfg: Config, pstate: PersistentState, vstate: Arc<RwLock<VolatileState>>) -> Self {
        Self {
            cfg: RwLock::new(cfg),
            pstate: RwLock::new(pstate),
            vstate,
        }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            pstate: &self.pstate,
            vstate: &self.vstate,
            cache: &discord_ctx.cache,
            http: &discord_ctx.http,
            cache_http: discord_ctx,
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        Event::Ready(ready).handle(self.ctx(&discord_ctx)).await;
    }

    async fn message(&self, discord_ctx: serenity::all::Context, msg: Message) {
        Event::Message(msg).handle(self.ctx(&discord_ctx)).await;
    }

    async fn interaction_create(&self, discord_ctx: serenity::all::Context, interaction: Interaction) {
        let event = match interaction {
            Interaction::Command(command) => Event::Command(command),
            Interaction::Component(component) => Event::Component(component),
            Interaction::Modal(modal) => Event::Modal(modal),
            // Pings and autocomplete are not used
            _ => return,
        };

        event.handle(self.ctx(&discord_ctx)).await;
    }

    async fn guild_member_addition(&self, discord_ctx: serenity::all::Context, new_member: Member) {
        Event::MemberJoin(new_member)
            .handle(self.ctx(&discord_ctx))
            .await;
    }
}
