//! Support tickets: private channels opened from a panel, claimed and closed by staff, with a
//! transcript kept in the ticket log.  Ticket types are managed in Discord through `/ticketadmin`
//! and persisted in the ticket configuration.

use crate::{
    context::Context,
    error::Error,
    event::*,
    helper::{
        is_administrator, modal_value, roles_of, selected_roles, selected_values, CustomId,
        InteractionHelper,
    },
    log_error, log_internal,
    logging::PrintColor,
    persistent_state::{slugify, TicketType, TicketTypes},
    plugin::Plugin,
};
use anyhow::{anyhow, Result};
use chrono::DateTime;
use serenity::all::{
    ButtonStyle, Channel, ChannelId, ChannelType, ComponentInteraction, CreateActionRow,
    CreateAttachment, CreateButton, CreateChannel, CreateCommand, CreateEmbed, CreateEmbedFooter,
    CreateInputText, CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
    CreateModal, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, EditChannel,
    GetMessages, GuildChannel, InputTextStyle, Message, MessageId, ModalInteraction,
    PermissionOverwrite, PermissionOverwriteType, Permissions, Timestamp, User, UserId,
};
use std::time::Duration;

const COLOR_CLOSED: u32 = 0xE74C3C;
const CLAIM_PREFIX: &str = "claimed_by:";
const NO_TYPES: &str = "none";
/// Messages per history request, capped by Discord
const HISTORY_PAGE: u8 = 100;

const DEFAULT_PANEL_DESCRIPTION: &str = "Welcome to the ticket channel.\n\n\
    This is your gateway to obtaining assistance from staff.\n\n\
    Choose a type of ticket below to get started.";

pub struct Tickets;

#[serenity::async_trait]
impl Plugin for Tickets {
    fn name(&self) -> &'static str {
        "tickets"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(
            "/ticketpanel - send the ticket creation panel\n\
             /ticketadmin - manage ticket types"
                .to_owned(),
        )
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![
            CreateCommand::new("ticketpanel")
                .description("Send the ticket creation panel")
                .default_member_permissions(Permissions::ADMINISTRATOR),
            CreateCommand::new("ticketadmin")
                .description("Open the ticket admin panel")
                .default_member_permissions(Permissions::ADMINISTRATOR),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some(command) = event.is_command("ticketpanel") {
            if !is_administrator(command.member.as_deref()) {
                command
                    .say_private(ctx, "You don't have permission to use this.")
                    .await?;
                return Ok(EventHandled::Yes);
            }
            command.say_private(ctx, "Ticket panel has been sent.").await?;
            post_panel(ctx, command.channel_id).await?;
            return Ok(EventHandled::Yes);
        }

        if let Some(command) = event.is_command("ticketadmin") {
            if !is_administrator(command.member.as_deref()) {
                command
                    .say_private(ctx, "You don't have permission to use this.")
                    .await?;
                return Ok(EventHandled::Yes);
            }
            command
                .respond(ctx, admin_panel(ctx.embed_color().await))
                .await?;
            return Ok(EventHandled::Yes);
        }

        if let Some((component, id)) = event.is_component("ticket") {
            match id.action {
                "open" => choose_type(ctx, component).await?,
                "claim" => claim(ctx, component).await?,
                "close" => request_close(ctx, component).await?,
                _ => {
                    if !is_administrator(component.member.as_ref()) {
                        component
                            .say_private(ctx, "You don't have permission to use this.")
                            .await?;
                        return Ok(EventHandled::Yes);
                    }
                    if !admin_component(ctx, component, &id).await? {
                        return Ok(EventHandled::No);
                    }
                }
            }
            return Ok(EventHandled::Yes);
        }

        if let Some((modal, id)) = event.is_modal("ticket") {
            match id.action {
                "reason" => {
                    let reason = modal_value(modal, "reason");
                    open_ticket(ctx, modal, &modal.user, &id.rest(), reason).await?
                }
                "close_submit" => close(ctx, modal).await?,
                _ => {
                    if !is_administrator(modal.member.as_ref()) {
                        modal
                            .say_private(ctx, "You don't have permission to use this.")
                            .await?;
                        return Ok(EventHandled::Yes);
                    }
                    if !admin_modal(ctx, modal, &id).await? {
                        return Ok(EventHandled::No);
                    }
                }
            }
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}

/// `report` → `Report`
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ticket_channel_name(type_name: &str, user: UserId) -> String {
    format!("{}-{}", slugify(type_name), user)
}

#[derive(Debug, PartialEq)]
enum Claim {
    Unclaimed,
    By(UserId),
    /// Marked claimed, but the claimant can't be read back
    Unknown,
}

fn claim_of(topic: Option<&str>) -> Claim {
    let Some(rest) = topic.and_then(|topic| topic.split_once(CLAIM_PREFIX)).map(|(_, rest)| rest)
    else {
        return Claim::Unclaimed;
    };

    rest.trim()
        .parse::<std::num::NonZeroU64>()
        .map(|id| Claim::By(UserId::from(id)))
        .unwrap_or(Claim::Unknown)
}

fn transcript_line(
    timestamp: i64,
    author_name: &str,
    author_id: UserId,
    content: &str,
    attachments: &[&str],
) -> String {
    let time = DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();

    let mut content = content.to_owned();
    for url in attachments {
        content.push(' ');
        content.push_str(url);
    }

    format!("[{}] {} ({}): {}\n", time, author_name, author_id, content)
}

fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            let attachments: Vec<&str> = message
                .attachments
                .iter()
                .map(|attachment| attachment.url.as_str())
                .collect();
            transcript_line(
                message.timestamp.unix_timestamp(),
                &message.author.name,
                message.author.id,
                &message.content,
                &attachments,
            )
        })
        .collect()
}

fn type_options(types: &TicketTypes) -> Vec<CreateSelectMenuOption> {
    types
        .iter()
        .map(|(name, settings)| {
            CreateSelectMenuOption::new(capitalize(name), name).description(&settings.description)
        })
        .collect()
}

fn type_names(types: &TicketTypes) -> Vec<CreateSelectMenuOption> {
    types
        .iter()
        .map(|(name, _)| CreateSelectMenuOption::new(name, name))
        .collect()
}

async fn post_panel(ctx: &Context<'_>, channel_id: ChannelId) -> Result<()> {
    let (title, description, color) = {
        let cfg = ctx.cfg.read().await;
        let description = if cfg.tickets.panel_description.is_empty() {
            DEFAULT_PANEL_DESCRIPTION.to_owned()
        } else {
            cfg.tickets.panel_description.clone()
        };
        (
            format!("{} Tickets", cfg.general.community_name),
            description,
            cfg.general.embed_color,
        )
    };

    let mut options = type_options(&ctx.pstate.read().await.tickets);
    if options.is_empty() {
        options.push(
            CreateSelectMenuOption::new("No ticket types configured!", NO_TYPES)
                .description("Ask staff to configure."),
        );
    }

    let menu = CreateSelectMenu::new("ticket:open", CreateSelectMenuKind::String { options })
        .placeholder("Choose a ticket type...")
        .min_values(1)
        .max_values(1);

    channel_id
        .send_message(
            ctx.http,
            CreateMessage::new()
                .embed(
                    CreateEmbed::new()
                        .title(title)
                        .description(description)
                        .color(color),
                )
                .components(vec![CreateActionRow::SelectMenu(menu)]),
        )
        .await?;
    Ok(())
}

async fn choose_type(ctx: &Context<'_>, component: &ComponentInteraction) -> Result<()> {
    let chosen = selected_values(component).first().cloned().unwrap_or_default();
    let settings = ctx.pstate.read().await.tickets.get(&chosen).cloned();

    let Some(settings) = settings.filter(|_| chosen != NO_TYPES) else {
        return component
            .say_private(ctx, "No ticket types are available. Please ask staff.")
            .await;
    };

    if settings.require_reason {
        let modal = CreateModal::new(format!("ticket:reason:{}", chosen), "Ticket Reason")
            .components(vec![CreateActionRow::InputText(
                CreateInputText::new(
                    InputTextStyle::Paragraph,
                    "Reason for opening the ticket",
                    "reason",
                )
                .placeholder("Describe your issue...")
                .required(true),
            )]);
        return component
            .respond(ctx, CreateInteractionResponse::Modal(modal))
            .await;
    }

    open_ticket(ctx, component, &component.user, &chosen, None).await
}

async fn open_ticket<I: InteractionHelper + Sync>(
    ctx: &Context<'_>,
    interaction: &I,
    user: &User,
    type_name: &str,
    reason: Option<String>,
) -> Result<()> {
    let Some(settings) = ctx.pstate.read().await.tickets.get(type_name).cloned() else {
        return interaction
            .say_private(ctx, "No ticket types are available. Please ask staff.")
            .await;
    };
    let (guild_id, color) = {
        let cfg = ctx.cfg.read().await;
        (cfg.general.guild_id, cfg.general.embed_color)
    };

    let name = ticket_channel_name(type_name, user.id);
    let existing = guild_id
        .channels(ctx.http)
        .await?
        .into_values()
        .find(|channel| channel.name == name);
    if let Some(existing) = existing {
        return interaction
            .say_private(
                ctx,
                &format!(
                    "You already have an open {} ticket: <#{}>",
                    type_name, existing.id
                ),
            )
            .await;
    }

    let mut overwrites = vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(guild_id.everyone_role()),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL
                | Permissions::SEND_MESSAGES
                | Permissions::READ_MESSAGE_HISTORY,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user.id),
        },
    ];
    overwrites.extend(settings.staff_roles.iter().map(|role| PermissionOverwrite {
        allow: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
        deny: Permissions::empty(),
        kind: PermissionOverwriteType::Role(*role),
    }));

    let audit_reason = format!("{} ticket opened by {}", capitalize(type_name), user.name);
    let mut builder = CreateChannel::new(name)
        .kind(ChannelType::Text)
        .permissions(overwrites)
        .audit_log_reason(&audit_reason);
    if let Some(category_id) = settings.category_id {
        builder = builder.category(category_id);
    }
    let channel = guild_id.create_channel(ctx.http, builder).await?;

    let mut description = format!(
        "<@{}> created a **{}** ticket.\nA staff member will be with you shortly.",
        user.id, type_name
    );
    if let Some(reason) = reason {
        description.push_str(&format!("\n\n**Reason:** {}", reason));
    }

    let buttons = CreateActionRow::Buttons(vec![
        CreateButton::new("ticket:close")
            .label("Close Ticket")
            .style(ButtonStyle::Danger),
        CreateButton::new("ticket:claim")
            .label("Claim Ticket")
            .style(ButtonStyle::Success),
    ]);
    channel
        .send_message(
            ctx.http,
            CreateMessage::new()
                .content("@here")
                .embed(
                    CreateEmbed::new()
                        .title(format!("{} Ticket", capitalize(type_name)))
                        .description(description)
                        .color(color),
                )
                .components(vec![buttons]),
        )
        .await?;

    log_internal!("Opened {} ticket {} for {}", type_name, channel.name, user.color());
    interaction
        .say_private(
            ctx,
            &format!(
                "Your **{}** ticket has been created: <#{}>",
                type_name, channel.id
            ),
        )
        .await
}

async fn guild_channel(ctx: &Context<'_>, channel_id: ChannelId) -> Result<GuildChannel> {
    channel_id
        .to_channel(ctx.cache_http)
        .await?
        .guild()
        .ok_or_else(|| anyhow!("Channel {} is not a guild channel", channel_id))
}

/// The ticket type the channel was opened as, or the actor-facing reason there is none
async fn resolve_type(ctx: &Context<'_>, channel: &GuildChannel) -> Result<(String, TicketType), Error> {
    ctx.pstate
        .read()
        .await
        .tickets
        .resolve(&channel.name)
        .map(|(name, settings)| (name.to_owned(), settings.clone()))
}

async fn claim(ctx: &Context<'_>, component: &ComponentInteraction) -> Result<()> {
    let channel = guild_channel(ctx, component.channel_id).await?;
    let (type_name, settings) = match resolve_type(ctx, &channel).await {
        Ok(resolved) => resolved,
        Err(e) => return component.say_private(ctx, &e.to_string()).await,
    };

    if !settings.is_staff(roles_of(component.member.as_ref())) {
        let refused = Error::NotPermitted("You don't have permission to claim this ticket.".into());
        return component.say_private(ctx, &refused.to_string()).await;
    }

    match claim_of(channel.topic.as_deref()) {
        Claim::Unclaimed => {}
        Claim::By(claimant) => {
            return component
                .say_private(
                    ctx,
                    &format!("This ticket is already claimed by <@{}>.", claimant),
                )
                .await
        }
        Claim::Unknown => {
            return component
                .say_private(ctx, "This ticket is already claimed by someone.")
                .await
        }
    }

    let user = component.user.id;
    component
        .channel_id
        .edit(
            ctx.http,
            EditChannel::new().topic(format!("{}{}", CLAIM_PREFIX, user)),
        )
        .await?;
    component
        .channel_id
        .send_message(
            ctx.http,
            CreateMessage::new().embed(
                CreateEmbed::new()
                    .title(format!("{} Ticket", capitalize(&type_name)))
                    .description(format!(
                        "<#{}> has been claimed by <@{}>.",
                        component.channel_id, user
                    ))
                    .color(ctx.embed_color().await),
            ),
        )
        .await?;

    log_internal!("Ticket {} claimed by {}", channel.name, component.user.color());
    component.say_private(ctx, "You have claimed this ticket!").await
}

async fn request_close(ctx: &Context<'_>, component: &ComponentInteraction) -> Result<()> {
    let channel = guild_channel(ctx, component.channel_id).await?;
    let settings = match resolve_type(ctx, &channel).await {
        Ok((_, settings)) => settings,
        Err(e) => return component.say_private(ctx, &e.to_string()).await,
    };

    if !settings.can_close(roles_of(component.member.as_ref())) {
        let refused = Error::NotPermitted("Only staff can close this ticket.".into());
        return component.say_private(ctx, &refused.to_string()).await;
    }

    let modal = CreateModal::new("ticket:close_submit", "Close Ticket").components(vec![
        CreateActionRow::InputText(
            CreateInputText::new(
                InputTextStyle::Paragraph,
                "Reason for closing the ticket",
                "reason",
            )
            .placeholder("Why are you closing this ticket?")
            .required(true),
        ),
    ]);
    component
        .respond(ctx, CreateInteractionResponse::Modal(modal))
        .await
}

/// The channel's whole history, oldest first
async fn history(ctx: &Context<'_>, channel_id: ChannelId) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut before: Option<MessageId> = None;

    loop {
        let mut request = GetMessages::new().limit(HISTORY_PAGE);
        if let Some(before) = before {
            request = request.before(before);
        }

        let page = channel_id.messages(ctx.http, request).await?;
        let full = page.len() == usize::from(HISTORY_PAGE);
        before = page.last().map(|message| message.id);
        messages.extend(page);

        if !full {
            break;
        }
    }

    messages.reverse();
    Ok(messages)
}

async fn close(ctx: &Context<'_>, modal: &ModalInteraction) -> Result<()> {
    let (delay, log_channel_id) = {
        let cfg = ctx.cfg.read().await;
        (cfg.tickets.close_delay_seconds, cfg.tickets.log_channel_id)
    };
    let reason = modal_value(modal, "reason").unwrap_or_default();

    modal
        .say_private(ctx, &format!("Closing ticket in {} seconds...", delay))
        .await?;
    tokio::time::sleep(Duration::from_secs(delay)).await;

    let channel = guild_channel(ctx, modal.channel_id).await?;

    match log_channel_id {
        Some(log_channel_id) => {
            let transcript = transcript(&history(ctx, channel.id).await?);
            let embed = CreateEmbed::new()
                .title("Ticket Closed")
                .description(format!("Ticket **{}** has been closed.", channel.name))
                .color(COLOR_CLOSED)
                .timestamp(Timestamp::now())
                .field("Closed By", format!("<@{}>", modal.user.id), true)
                .field("Reason", reason, false)
                .field("Ticket Channel", &channel.name, true)
                .footer(CreateEmbedFooter::new(format!("User ID: {}", modal.user.id)));
            let file = CreateAttachment::bytes(
                transcript.into_bytes(),
                format!("transcript-{}.txt", channel.name),
            );

            if let Err(e) = log_channel_id
                .send_message(ctx.http, CreateMessage::new().embed(embed).add_file(file))
                .await
            {
                log_error!("Could not log closed ticket {}: {}", channel.name, e);
            }
        }
        None => log_error!("No ticket log channel; {} closes unlogged", channel.name),
    }

    channel.delete(ctx.http).await?;
    log_internal!("Ticket {} closed by {}", channel.name, modal.user.color());
    Ok(())
}

fn admin_panel(color: u32) -> CreateInteractionResponse {
    let buttons = CreateActionRow::Buttons(vec![
        CreateButton::new("ticket:add")
            .label("Add Ticket Type")
            .style(ButtonStyle::Success),
        CreateButton::new("ticket:remove")
            .label("Remove Ticket Type")
            .style(ButtonStyle::Danger),
        CreateButton::new("ticket:configure")
            .label("Configure Ticket Type")
            .style(ButtonStyle::Primary),
    ]);

    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(
                CreateEmbed::new()
                    .title("Ticket Admin Panel")
                    .description(
                        "Use the buttons below to manage ticket types, staff roles, and categories.",
                    )
                    .color(color),
            )
            .components(vec![buttons])
            .ephemeral(true),
    )
}

fn config_embed(type_name: &str, settings: &TicketType, color: u32) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("Config: {}", capitalize(type_name)))
        .description(settings.summary())
        .color(color)
}

fn config_buttons(type_name: &str) -> Vec<CreateActionRow> {
    let button = |action: &str, label: &str| {
        CreateButton::new(format!("ticket:{}:{}", action, type_name))
            .label(label)
            .style(ButtonStyle::Secondary)
    };

    vec![CreateActionRow::Buttons(vec![
        button("set_category", "Set Category"),
        button("set_roles", "Set Staff Roles"),
        button("set_description", "Set Description"),
        button("toggle_close", "Toggle Close Permission"),
        button("toggle_reason", "Toggle Require Reason"),
    ])]
}

fn single_input_modal(custom_id: String, title: &str, label: &str, input_id: &str) -> CreateInteractionResponse {
    CreateInteractionResponse::Modal(CreateModal::new(custom_id, title).components(vec![
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, label, input_id).required(true),
        ),
    ]))
}

fn type_select(custom_id: &str, placeholder: &str, content: &str, types: &TicketTypes) -> CreateInteractionResponse {
    let menu = CreateSelectMenu::new(
        custom_id,
        CreateSelectMenuKind::String {
            options: type_names(types),
        },
    )
    .placeholder(placeholder);

    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .components(vec![CreateActionRow::SelectMenu(menu)])
            .ephemeral(true),
    )
}

/// Apply a change to one ticket type and persist it.  The outer error is a plumbing failure, the
/// inner one is for the actor.
async fn update_type<T>(
    ctx: &Context<'_>,
    type_name: &str,
    change: impl FnOnce(&mut TicketType) -> T,
) -> Result<Result<T, Error>> {
    let mut pstate = ctx.pstate.write().await;
    let outcome = match pstate.tickets.get_mut(type_name) {
        Ok(settings) => change(settings),
        Err(e) => return Ok(Err(e)),
    };
    pstate.save().await?;
    Ok(Ok(outcome))
}

/// Returns false for ids this plugin doesn't know
async fn admin_component(
    ctx: &Context<'_>,
    component: &ComponentInteraction,
    id: &CustomId<'_>,
) -> Result<bool> {
    let type_name = id.rest();

    match id.action {
        "add" => {
            component
                .respond(
                    ctx,
                    single_input_modal(
                        "ticket:add_submit".to_owned(),
                        "Add Ticket Type",
                        "Name of the new ticket type",
                        "name",
                    ),
                )
                .await?;
        }
        "remove" | "configure" => {
            let pstate = ctx.pstate.read().await;
            if pstate.tickets.is_empty() {
                component
                    .say_private(ctx, "No ticket types available.")
                    .await?;
            } else if id.action == "remove" {
                component
                    .respond(
                        ctx,
                        type_select(
                            "ticket:remove_select",
                            "Select a ticket type to remove",
                            "Select a ticket type to remove:",
                            &pstate.tickets,
                        ),
                    )
                    .await?;
            } else {
                component
                    .respond(
                        ctx,
                        type_select(
                            "ticket:configure_select",
                            "Select a ticket type to configure",
                            "Select a ticket type to configure:",
                            &pstate.tickets,
                        ),
                    )
                    .await?;
            }
        }
        "remove_select" => {
            let chosen = selected_values(component).first().cloned().unwrap_or_default();
            let mut pstate = ctx.pstate.write().await;
            match pstate.tickets.remove(&chosen) {
                Ok(_) => {
                    pstate.save().await?;
                    log_internal!("Removed ticket type {}", chosen);
                    component
                        .say_private(ctx, &format!("Removed ticket type `{}`.", chosen))
                        .await?;
                }
                Err(e) => component.say_private(ctx, &e.to_string()).await?,
            }
        }
        "configure_select" => {
            let chosen = selected_values(component).first().cloned().unwrap_or_default();
            let settings = ctx.pstate.read().await.tickets.get(&chosen).cloned();
            match settings {
                Some(settings) => {
                    component
                        .respond(
                            ctx,
                            CreateInteractionResponse::Message(
                                CreateInteractionResponseMessage::new()
                                    .embed(config_embed(
                                        &chosen,
                                        &settings,
                                        ctx.embed_color().await,
                                    ))
                                    .components(config_buttons(&chosen))
                                    .ephemeral(true),
                            ),
                        )
                        .await?;
                }
                None => {
                    let missing = Error::ConfigurationMissing(format!("ticket type `{}`", chosen));
                    component.say_private(ctx, &missing.to_string()).await?
                }
            }
        }
        "set_category" => {
            component
                .respond(
                    ctx,
                    single_input_modal(
                        format!("ticket:category_submit:{}", type_name),
                        "Set Category",
                        "Category ID",
                        "category_id",
                    ),
                )
                .await?;
        }
        "set_roles" => {
            let menu = CreateSelectMenu::new(
                format!("ticket:roles_select:{}", type_name),
                CreateSelectMenuKind::Role {
                    default_roles: None,
                },
            )
            .placeholder("Staff roles")
            .min_values(1)
            .max_values(25);
            component
                .respond(
                    ctx,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("Select the staff roles allowed to access this ticket type:")
                            .components(vec![CreateActionRow::SelectMenu(menu)])
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
        "roles_select" => {
            let roles = selected_roles(component).to_vec();
            if roles.is_empty() {
                component
                    .say_private(ctx, "You must select at least one role.")
                    .await?;
                return Ok(true);
            }
            let reply = match update_type(ctx, &type_name, |settings| settings.staff_roles = roles).await? {
                Ok(()) => "Staff roles updated!".to_owned(),
                Err(e) => e.to_string(),
            };
            component.say_private(ctx, &reply).await?;
        }
        "set_description" => {
            component
                .respond(
                    ctx,
                    single_input_modal(
                        format!("ticket:description_submit:{}", type_name),
                        "Set Description",
                        "Description",
                        "description",
                    ),
                )
                .await?;
        }
        "toggle_close" => {
            let reply = match update_type(ctx, &type_name, TicketType::toggle_close_permission).await? {
                Ok(permission) => format!(
                    "Close permission set to **{}** for `{}`.",
                    permission, type_name
                ),
                Err(e) => e.to_string(),
            };
            component.say_private(ctx, &reply).await?;
        }
        "toggle_reason" => {
            let reply = match update_type(ctx, &type_name, TicketType::toggle_require_reason).await? {
                Ok(required) => format!(
                    "Require reason has been **{}** for `{}`.",
                    if required { "enabled" } else { "disabled" },
                    type_name
                ),
                Err(e) => e.to_string(),
            };
            component.say_private(ctx, &reply).await?;
        }
        _ => return Ok(false),
    }

    Ok(true)
}

/// Returns false for ids this plugin doesn't know
async fn admin_modal(ctx: &Context<'_>, modal: &ModalInteraction, id: &CustomId<'_>) -> Result<bool> {
    let type_name = id.rest();

    match id.action {
        "add_submit" => {
            let name = modal_value(modal, "name").unwrap_or_default();
            let mut pstate = ctx.pstate.write().await;
            match pstate.tickets.add(&name) {
                Ok(name) => {
                    pstate.save().await?;
                    log_internal!("Added ticket type {}", name);
                    modal
                        .say_private(ctx, &format!("Ticket type `{}` created!", name))
                        .await?;
                }
                Err(e) => modal.say_private(ctx, &e.to_string()).await?,
            }
        }
        "category_submit" => {
            let category_id = modal_value(modal, "category_id")
                .and_then(|value| value.trim().parse::<std::num::NonZeroU64>().ok())
                .map(ChannelId::from);
            let Some(category_id) = category_id else {
                modal
                    .say_private(ctx, "Please provide a valid numeric category ID.")
                    .await?;
                return Ok(true);
            };

            let guild_id = ctx.guild_id().await;
            let category = match category_id.to_channel(ctx.cache_http).await {
                Ok(Channel::Guild(channel))
                    if channel.kind == ChannelType::Category && channel.guild_id == guild_id =>
                {
                    channel
                }
                _ => {
                    modal
                        .say_private(ctx, "That ID does not belong to a valid category.")
                        .await?;
                    return Ok(true);
                }
            };

            let reply = match update_type(ctx, &type_name, |settings| {
                settings.category_id = Some(category_id)
            })
            .await?
            {
                Ok(()) => format!("Category set to **{}**", category.name),
                Err(e) => e.to_string(),
            };
            modal.say_private(ctx, &reply).await?;
        }
        "description_submit" => {
            let description = modal_value(modal, "description").unwrap_or_default();
            let updated = update_type(ctx, &type_name, |settings| {
                settings.description = description;
                settings.clone()
            })
            .await?;

            match updated {
                // Refresh the configuration panel the modal was opened from
                Ok(settings) => {
                    modal
                        .respond(
                            ctx,
                            CreateInteractionResponse::UpdateMessage(
                                CreateInteractionResponseMessage::new().embed(config_embed(
                                    &type_name,
                                    &settings,
                                    ctx.embed_color().await,
                                )),
                            ),
                        )
                        .await?;
                    modal.follow_up_private(ctx, "Description updated!").await?;
                }
                Err(e) => modal.say_private(ctx, &e.to_string()).await?,
            }
        }
        _ => return Ok(false),
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_type_names() {
        assert_eq!(capitalize("report"), "Report");
        assert_eq!(capitalize("player report"), "Player report");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn channel_names_use_the_slug() {
        assert_eq!(
            ticket_channel_name("Player Report", UserId::new(42)),
            "player-report-42"
        );
    }

    #[test]
    fn reads_claims_from_topic() {
        assert_eq!(claim_of(None), Claim::Unclaimed);
        assert_eq!(claim_of(Some("Support for the store")), Claim::Unclaimed);
        assert_eq!(
            claim_of(Some("claimed_by:1311949979325038600")),
            Claim::By(UserId::new(1311949979325038600))
        );
        assert_eq!(claim_of(Some("claimed_by: 77 ")), Claim::By(UserId::new(77)));
        assert_eq!(claim_of(Some("claimed_by:nobody")), Claim::Unknown);
    }

    #[test]
    fn transcript_lines() {
        // 2024-01-02 03:04:05 UTC
        let timestamp = 1_704_164_645;

        assert_eq!(
            transcript_line(timestamp, "alice", UserId::new(7), "hello", &[]),
            "[2024-01-02 03:04:05] alice (7): hello\n"
        );
        assert_eq!(
            transcript_line(
                timestamp,
                "bob",
                UserId::new(8),
                "see attached",
                &["https://cdn.example/a.png", "https://cdn.example/b.png"]
            ),
            "[2024-01-02 03:04:05] bob (8): see attached https://cdn.example/a.png https://cdn.example/b.png\n"
        );
    }
}
