//! Allowlist applications.  Members apply through a modal, staff decide with buttons on the
//! request posted to the staff log channel.
//!
//! Nothing is kept in memory between the steps except the retry cooldown: the applicant rides in
//! the decision buttons' custom ids and the answers are read back off the request embed, so
//! pending requests can still be decided after a restart.

use crate::{
    context::Context,
    duration::format_countdown,
    event::*,
    helper::{is_administrator, modal_value, CustomId, InteractionHelper},
    log_internal,
    plugin::Plugin,
};
use anyhow::{anyhow, Result};
use serenity::all::{
    ButtonStyle, ComponentInteraction, CreateActionRow, CreateButton, CreateCommand, CreateEmbed,
    CreateEmbedFooter, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateModal, EditMember, Embed,
    InputTextStyle, ModalInteraction, Permissions, UserId,
};
use std::time::Duration;

const COLOR_APPROVED: u32 = 0x2ECC71;
const COLOR_DENIED: u32 = 0xE74C3C;
const BACKSTORY_MAX_LEN: u16 = 4000;

const FIELD_USER: &str = "User";
const FIELD_CHARACTER_NAME: &str = "Character Name";
const FIELD_STEAM_NAME: &str = "Steam Name";

pub struct Verify;

/// One submitted application
#[derive(Debug, PartialEq)]
struct Application {
    user: UserId,
    character_name: String,
    steam_name: String,
    backstory: String,
}

impl Application {
    /// The request embed.  The backstory is the description since it outgrows a field.
    fn embed(&self, title: &str, color: u32) -> CreateEmbed {
        CreateEmbed::new()
            .title(title)
            .color(color)
            .description(&self.backstory)
            .field(FIELD_USER, format!("<@{}> ({})", self.user, self.user), false)
            .field(FIELD_CHARACTER_NAME, &self.character_name, false)
            .field(FIELD_STEAM_NAME, &self.steam_name, false)
    }

    fn from_embed(user: UserId, embed: &Embed) -> Option<Self> {
        let fields: Vec<(&str, &str)> = embed
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
            .collect();
        Self::from_parts(user, &fields, embed.description.as_deref())
    }

    fn from_parts(user: UserId, fields: &[(&str, &str)], description: Option<&str>) -> Option<Self> {
        let field = |name: &str| {
            fields
                .iter()
                .find(|(field_name, _)| *field_name == name)
                .map(|(_, value)| value.to_string())
        };

        Some(Self {
            user,
            character_name: field(FIELD_CHARACTER_NAME)?,
            steam_name: field(FIELD_STEAM_NAME)?,
            backstory: description.unwrap_or_default().to_owned(),
        })
    }
}

enum Decision {
    Approve,
    Deny,
}

fn decision_buttons(user: UserId) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(format!("verify:approve:{}", user))
            .label("Approve")
            .style(ButtonStyle::Success),
        CreateButton::new(format!("verify:deny:{}", user))
            .label("Deny")
            .style(ButtonStyle::Danger),
    ])
}

fn cooldown_message(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!(
        "You must wait {}m {}s before trying again.",
        secs / 60,
        secs % 60
    )
}

#[serenity::async_trait]
impl Plugin for Verify {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/setupverify - send the allowlist panel to this channel".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("setupverify")
            .description("Setup Allowlist embed")
            .default_member_permissions(Permissions::ADMINISTRATOR)]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some(command) = event.is_command("setupverify") {
            if !is_administrator(command.member.as_deref()) {
                command
                    .say_private(ctx, "You don't have permission to use this command.")
                    .await?;
                return Ok(EventHandled::Yes);
            }

            command
                .say_private(ctx, "Allowlist Application system has been set up!")
                .await?;
            post_panel(ctx, command.channel_id).await?;
            return Ok(EventHandled::Yes);
        }

        if let Some((component, id)) = event.is_component("verify") {
            match id.action {
                "apply" => apply(ctx, component).await?,
                "approve" => decide(ctx, component, &id, Decision::Approve).await?,
                "deny" => decide(ctx, component, &id, Decision::Deny).await?,
                _ => return Ok(EventHandled::No),
            }
            return Ok(EventHandled::Yes);
        }

        if let Some((modal, id)) = event.is_modal("verify") {
            if id.action != "submit" {
                return Ok(EventHandled::No);
            }
            submit(ctx, modal).await?;
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}

async fn post_panel(ctx: &Context<'_>, channel_id: serenity::all::ChannelId) -> Result<()> {
    let cfg = ctx.cfg.read().await;
    let description = if cfg.verify.panel_description.is_empty() {
        format!(
            "You can apply by clicking the `Apply` button below!\n\n\
             After you have submitted your application, please wait for a response.\n\n\
             Thank you,\n\n{} Team",
            cfg.general.community_name
        )
    } else {
        cfg.verify.panel_description.clone()
    };

    let embed = CreateEmbed::new()
        .title(format!(
            "Welcome to the {} Discord Server",
            cfg.general.community_name
        ))
        .description(description)
        .color(cfg.general.embed_color);
    let apply = CreateActionRow::Buttons(vec![CreateButton::new("verify:apply")
        .label("Apply")
        .style(ButtonStyle::Primary)]);

    channel_id
        .send_message(
            ctx.http,
            CreateMessage::new().embed(embed).components(vec![apply]),
        )
        .await?;
    Ok(())
}

async fn apply(ctx: &Context<'_>, component: &ComponentInteraction) -> Result<()> {
    let remaining = ctx
        .vstate
        .read()
        .await
        .verify_cooldowns
        .remaining(component.user.id);
    if let Some(remaining) = remaining {
        return component
            .say_private(ctx, &cooldown_message(remaining))
            .await;
    }

    let modal = CreateModal::new("verify:submit", "Whitelist").components(vec![
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, FIELD_CHARACTER_NAME, "character_name")
                .placeholder("Enter your character name")
                .required(true),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, FIELD_STEAM_NAME, "steam_name")
                .placeholder("Enter your Steam name")
                .required(true),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Paragraph, "Character Backstory", "backstory")
                .placeholder("Write a short backstory for your character...(Min. Words 250)")
                .max_length(BACKSTORY_MAX_LEN)
                .required(true),
        ),
    ]);

    component
        .respond(ctx, CreateInteractionResponse::Modal(modal))
        .await
}

async fn submit(ctx: &Context<'_>, modal: &ModalInteraction) -> Result<()> {
    let user = modal.user.id;
    let (blacklisted, log_channel_id, color) = {
        let cfg = ctx.cfg.read().await;
        (
            cfg.verify.blacklist.contains(&user),
            cfg.verify.log_channel_id,
            cfg.general.embed_color,
        )
    };

    if blacklisted {
        return modal
            .say_private(ctx, "You are blacklisted and cannot verify.")
            .await;
    }

    let application = Application {
        user,
        character_name: modal_value(modal, "character_name").unwrap_or_default(),
        steam_name: modal_value(modal, "steam_name").unwrap_or_default(),
        backstory: modal_value(modal, "backstory").unwrap_or_default(),
    };

    log_channel_id
        .send_message(
            ctx.http,
            CreateMessage::new()
                .content("@here")
                .embed(application.embed("Whitelist Request", color))
                .components(vec![decision_buttons(user)]),
        )
        .await?;

    log_internal!("Allowlist application from {} sent to staff", user);
    modal
        .say_private(ctx, "Your Allowlist request has been sent to staff.")
        .await
}

async fn decide(
    ctx: &Context<'_>,
    component: &ComponentInteraction,
    id: &CustomId<'_>,
    decision: Decision,
) -> Result<()> {
    let user: UserId = id
        .id_arg(0)
        .ok_or_else(|| anyhow!("Malformed decision id `{}`", component.data.custom_id))?;
    let Some(application) = component
        .message
        .embeds
        .first()
        .and_then(|embed| Application::from_embed(user, embed))
    else {
        return component
            .say_private(ctx, "This request could not be read.")
            .await;
    };

    let cfg = ctx.cfg.read().await;
    let verify = &cfg.verify;

    let (staff_embed, public_embed, image_url) = match decision {
        Decision::Approve => {
            let guild_id = cfg.general.guild_id;
            let member = match guild_id.member(ctx.cache_http, user).await {
                Ok(member) => member,
                Err(_) => {
                    return component
                        .say_private(ctx, "That user is no longer in the server.")
                        .await
                }
            };
            member.add_role(ctx.http, verify.verified_role_id).await?;

            let nickname = EditMember::new().nickname(&application.character_name);
            if guild_id.edit_member(ctx.http, user, nickname).await.is_err() {
                return component
                    .say_private(ctx, "I don't have permission to change that user's nickname.")
                    .await;
            }

            (
                application.embed("Whitelist Request - Approved", COLOR_APPROVED),
                CreateEmbed::new()
                    .title("✅ Whitelist Approved")
                    .description(format!(
                        "<@{}> has been **approved and Whitelisted!**",
                        user
                    ))
                    .color(COLOR_APPROVED)
                    .field(FIELD_CHARACTER_NAME, &application.character_name, false),
                verify.approved_image_url.clone(),
            )
        }
        Decision::Deny => {
            let cooldown = Duration::from_secs(verify.retry_cooldown_seconds);
            ctx.vstate
                .write()
                .await
                .verify_cooldowns
                .start(user, cooldown);
            let retry = format_countdown(cooldown.as_secs());

            (
                application
                    .embed("Whitelist Request - Denied", COLOR_DENIED)
                    .footer(CreateEmbedFooter::new(format!(
                        "User may retry in {}.",
                        retry
                    ))),
                application
                    .embed("❌ Whitelist Denied", COLOR_DENIED)
                    .description(format!(
                        "<@{}>, your Whitelist request was denied.",
                        user
                    ))
                    .footer(CreateEmbedFooter::new(format!(
                        "You may retry after {}.",
                        retry
                    ))),
                verify.denied_image_url.clone(),
            )
        }
    };

    component
        .respond(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(staff_embed)
                    .components(Vec::new()),
            ),
        )
        .await?;

    if let Some(public_log) = verify.public_log_channel_id {
        let public_embed = match image_url {
            Some(url) => public_embed.image(url),
            None => public_embed,
        };
        public_log
            .send_message(ctx.http, CreateMessage::new().embed(public_embed))
            .await?;
    }

    log_internal!(
        "Allowlist application from {} {}",
        user,
        match decision {
            Decision::Approve => "approved",
            Decision::Deny => "denied",
        }
    );
    Ok(())
}
