//! Miscellaneous convenience methods

use crate::context::Context;
use anyhow::Result;
use serenity::all::{
    ActionRowComponent, ChannelId, CommandDataOption, CommandDataOptionValue, CommandInteraction,
    ComponentInteraction, ComponentInteractionDataKind, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, Member, ModalInteraction, Permissions, RoleId, UserId,
};
use std::{num::NonZeroU64, str::FromStr};

/// A parsed component custom id, `<namespace>:<action>[:<arg>...]`
#[derive(Debug, PartialEq, Eq)]
pub struct CustomId<'a> {
    pub namespace: &'a str,
    pub action: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> CustomId<'a> {
    pub fn parse(custom_id: &'a str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        let namespace = parts.next().filter(|s| !s.is_empty())?;
        let action = parts.next().filter(|s| !s.is_empty())?;

        Some(Self {
            namespace,
            action,
            args: parts.collect(),
        })
    }

    /// Parse the argument at `index`
    pub fn arg<T: FromStr>(&self, index: usize) -> Option<T> {
        self.args.get(index)?.parse().ok()
    }

    /// Parse the argument at `index` as a Discord id
    pub fn id_arg<T: From<NonZeroU64>>(&self, index: usize) -> Option<T> {
        self.arg::<NonZeroU64>(index).map(T::from)
    }

    /// Every argument rejoined, for values which may themselves contain `:`
    pub fn rest(&self) -> String {
        self.args.join(":")
    }
}

/// Typed lookups into slash command arguments
pub trait CommandOptions {
    fn option(&self, name: &str) -> Option<&CommandDataOptionValue>;

    fn str_option(&self, name: &str) -> Option<&str> {
        match self.option(name)? {
            CommandDataOptionValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn int_option(&self, name: &str) -> Option<i64> {
        match self.option(name)? {
            CommandDataOptionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    fn bool_option(&self, name: &str) -> Option<bool> {
        match self.option(name)? {
            CommandDataOptionValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn user_option(&self, name: &str) -> Option<UserId> {
        match self.option(name)? {
            CommandDataOptionValue::User(id) => Some(*id),
            _ => None,
        }
    }

    fn channel_option(&self, name: &str) -> Option<ChannelId> {
        match self.option(name)? {
            CommandDataOptionValue::Channel(id) => Some(*id),
            _ => None,
        }
    }
}

impl CommandOptions for [CommandDataOption] {
    fn option(&self, name: &str) -> Option<&CommandDataOptionValue> {
        self.iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }
}

impl CommandOptions for CommandInteraction {
    fn option(&self, name: &str) -> Option<&CommandDataOptionValue> {
        self.data.options.option(name)
    }
}

/// The submitted value of a modal text input
pub fn modal_value(modal: &ModalInteraction, custom_id: &str) -> Option<String> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == custom_id => {
                input.value.clone()
            }
            _ => None,
        })
        .filter(|value| !value.trim().is_empty())
}

/// The chosen values of a string select menu
pub fn selected_values(component: &ComponentInteraction) -> &[String] {
    match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values,
        _ => &[],
    }
}

/// The chosen roles of a role select menu
pub fn selected_roles(component: &ComponentInteraction) -> &[RoleId] {
    match &component.data.kind {
        ComponentInteractionDataKind::RoleSelect { values } => values,
        _ => &[],
    }
}

/// Guild permissions the interaction's member holds.  Empty outside a guild.
pub fn permissions_of(member: Option<&Member>) -> Permissions {
    member
        .and_then(|member| member.permissions)
        .unwrap_or_else(Permissions::empty)
}

pub fn is_administrator(member: Option<&Member>) -> bool {
    permissions_of(member).administrator()
}

/// Administrator, manage messages or manage server
pub fn is_moderator(member: Option<&Member>) -> bool {
    permissions_of(member)
        .intersects(Permissions::ADMINISTRATOR | Permissions::MANAGE_MESSAGES | Permissions::MANAGE_GUILD)
}

pub fn roles_of(member: Option<&Member>) -> &[RoleId] {
    member.map(|member| member.roles.as_slice()).unwrap_or(&[])
}

/// Responses common to commands, components and modal submissions
#[serenity::async_trait]
pub trait InteractionHelper {
    async fn respond(&self, ctx: &Context, response: CreateInteractionResponse) -> Result<()>;
    async fn follow_up(&self, ctx: &Context, followup: CreateInteractionResponseFollowup)
        -> Result<()>;

    /// Tell only the actor
    async fn say_private(&self, ctx: &Context, content: &str) -> Result<()> {
        self.respond(
            ctx,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
    }

    async fn embed_private(&self, ctx: &Context, embed: CreateEmbed) -> Result<()> {
        self.respond(
            ctx,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await
    }

    /// Acknowledge now, answer later with [`InteractionHelper::follow_up_private`]
    async fn defer_private(&self, ctx: &Context) -> Result<()> {
        self.respond(
            ctx,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
        )
        .await
    }

    async fn follow_up_private(&self, ctx: &Context, content: &str) -> Result<()> {
        self.follow_up(
            ctx,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await
    }
}

macro_rules! impl_interaction_helper {
    ($($interaction:ty),*) => {$(
        #[serenity::async_trait]
        impl InteractionHelper for $interaction {
            async fn respond(
                &self,
                ctx: &Context,
                response: CreateInteractionResponse,
            ) -> Result<()> {
                self.create_response(ctx.cache_http, response).await?;
                Ok(())
            }

            async fn follow_up(
                &self,
                ctx: &Context,
                followup: CreateInteractionResponseFollowup,
            ) -> Result<()> {
                self.create_followup(ctx.cache_http, followup).await?;
                Ok(())
            }
        }
    )*};
}

impl_interaction_helper!(CommandInteraction, ComponentInteraction, ModalInteraction);
