use crate::{context::Context, event::*, log_internal, logging::PrintColor, plugin::Plugin};
use anyhow::Result;
use chrono::DateTime;
use serenity::all::{ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, Member};

const COLOR_WELCOME: u32 = 0x2ECC71;

/// Greets members as they join
pub struct Welcome;

#[serenity::async_trait]
impl Plugin for Welcome {
    fn name(&self) -> &'static str {
        "welcome"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::MemberJoin(member) = event else {
            return Ok(EventHandled::No);
        };

        let configured = ctx.cfg.read().await.welcome.channel_id;
        let (guild_name, system_channel, member_count) = match ctx.cache.guild(member.guild_id) {
            Some(guild) => (
                Some(guild.name.clone()),
                guild.system_channel_id,
                Some(guild.member_count),
            ),
            None => (None, None, None),
        };

        // Fall back to the server's system channel, or skip
        let Some(channel_id) = configured.or(system_channel) else {
            return Ok(EventHandled::No);
        };

        let embed = welcome_embed(ctx, member, guild_name, member_count).await;
        channel_id
            .send_message(ctx.http, CreateMessage::new().embed(embed))
            .await?;

        log_internal!("Welcomed {}", member.user.color());
        Ok(EventHandled::No)
    }
}

fn channel_ref(channel_id: Option<ChannelId>) -> String {
    channel_id
        .map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "the channel list".to_owned())
}

async fn welcome_embed(
    ctx: &Context<'_>,
    member: &Member,
    guild_name: Option<String>,
    member_count: Option<u64>,
) -> CreateEmbed {
    let cfg = ctx.cfg.read().await;
    let welcome = &cfg.welcome;
    let guild_name = guild_name.unwrap_or_else(|| cfg.general.community_name.clone());

    let joined_discord = DateTime::from_timestamp(member.user.id.created_at().unix_timestamp(), 0)
        .map(|created| created.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "Unknown".to_owned());

    let mut embed = CreateEmbed::new()
        .title(format!("🎉 Welcome to {}! 🎉", cfg.general.community_name))
        .description(format!(
            "Hey <@{}>, welcome to **{}**! \n\n\
             We're excited to have you join our community. 🎉 \n\n\
             - Make sure to read Server Rules Here {}. \n\n\
             - Get allowlisted to play here {} and Connect server from here {}.",
            member.user.id,
            guild_name,
            channel_ref(welcome.rules_channel_id),
            channel_ref(welcome.allowlist_channel_id),
            channel_ref(welcome.connect_channel_id),
        ))
        .color(COLOR_WELCOME)
        .thumbnail(member.face())
        .field("Username", &member.user.name, true)
        .field("ID", member.user.id.to_string(), true)
        .field("Joined Discord", joined_discord, false);

    if let Some(count) = member_count {
        embed = embed.footer(CreateEmbedFooter::new(format!("Member #{}", count)));
    }
    if let Some(image_url) = &welcome.image_url {
        embed = embed.image(image_url);
    }

    embed
}
