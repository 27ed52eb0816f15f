use crate::{context::Context, event::*, helper::InteractionHelper, plugin::Plugin};
use anyhow::Result;
use chrono::{DateTime, TimeZone};
use serenity::all::{
    ChannelType, CreateCommand, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, RoleId, Timestamp, UserId,
};

/// Role mentions listed before the rest are summarized
const ROLES_SHOWN: usize = 20;

pub struct ServerInfo;

/// What the embed shows, copied out of the cache
struct Summary {
    name: String,
    icon_url: Option<String>,
    member_count: u64,
    /// Without @everyone, highest first
    roles: Vec<RoleId>,
    categories: usize,
    text_channels: usize,
    voice_channels: usize,
    owner_id: UserId,
    created_at: i64,
}

#[serenity::async_trait]
impl Plugin for ServerInfo {
    fn name(&self) -> &'static str {
        "server_info"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/serverinfo - show information about this server".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("serverinfo").description("Shows information about this server.")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_command("serverinfo") else {
            return Ok(EventHandled::No);
        };

        let (guild_id, color, tz) = {
            let cfg = ctx.cfg.read().await;
            (cfg.general.guild_id, cfg.general.embed_color, cfg.general.tz())
        };
        let guild_id = command.guild_id.unwrap_or(guild_id);

        let Some(summary) = summarize(ctx, guild_id) else {
            command
                .say_private(ctx, "This command can only be used in a server.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        let mut embed = CreateEmbed::new()
            .title(format!("Server Info — {}", summary.name))
            .color(color)
            .timestamp(Timestamp::now())
            .field("Members", summary.member_count.to_string(), true)
            // @everyone counts here, as Discord does
            .field("Roles", (summary.roles.len() + 1).to_string(), true)
            .field("Categories", summary.categories.to_string(), true)
            .field("Text Channels", summary.text_channels.to_string(), true)
            .field("Voice Channels", summary.voice_channels.to_string(), true)
            .field("Role List", role_list(&summary.roles), false)
            .field("Owner", format!("<@{}>", summary.owner_id), true)
            .field("Server ID", guild_id.to_string(), true)
            .field("Created On", created_on(summary.created_at, &tz), true);
        if let Some(icon_url) = summary.icon_url {
            embed = embed.thumbnail(icon_url);
        }

        command
            .respond(
                ctx,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new().embed(embed),
                ),
            )
            .await?;
        Ok(EventHandled::Yes)
    }
}

fn summarize(ctx: &Context<'_>, guild_id: serenity::all::GuildId) -> Option<Summary> {
    let guild = ctx.cache.guild(guild_id)?;

    let mut roles: Vec<_> = guild
        .roles
        .values()
        .filter(|role| role.id.get() != guild_id.get())
        .collect();
    roles.sort_by(|a, b| b.position.cmp(&a.position));

    let count = |kind: ChannelType| guild.channels.values().filter(|c| c.kind == kind).count();

    Some(Summary {
        name: guild.name.clone(),
        icon_url: guild.icon_url(),
        member_count: guild.member_count,
        roles: roles.iter().map(|role| role.id).collect(),
        categories: count(ChannelType::Category),
        text_channels: count(ChannelType::Text),
        voice_channels: count(ChannelType::Voice),
        owner_id: guild.owner_id,
        created_at: guild_id.created_at().unix_timestamp(),
    })
}

fn role_list(roles: &[RoleId]) -> String {
    if roles.is_empty() {
        return "No roles".to_owned();
    }

    let mut list = roles
        .iter()
        .take(ROLES_SHOWN)
        .map(|role| format!("<@&{}>", role))
        .collect::<Vec<_>>()
        .join(", ");
    if roles.len() > ROLES_SHOWN {
        list.push_str(&format!(" … and {} more", roles.len() - ROLES_SHOWN));
    }
    list
}

fn created_on<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    DateTime::from_timestamp(timestamp, 0)
        .map(|created| {
            created
                .with_timezone(tz)
                .format("%B %d, %Y %-I:%M%p")
                .to_string()
        })
        .unwrap_or_else(|| "Unknown".to_owned())
}
