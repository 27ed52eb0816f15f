use crate::{
    context::Context,
    error::Error,
    event::*,
    helper::{CommandOptions, InteractionHelper},
    log_error,
    plugin::Plugin,
};
use anyhow::Result;
use serde_json::Value;
use serenity::all::{
    CommandOptionType, CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponseFollowup, Permissions,
};
use sqlx::{mysql::MySqlConnection, Connection};

const PLAYER_QUERY: &str = "SELECT money, charinfo FROM players WHERE license = ?";

/// Read-only lookups into the game server's player table
pub struct PlayerLookup;

#[serenity::async_trait]
impl Plugin for PlayerLookup {
    fn name(&self) -> &'static str {
        "player_lookup"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/playerinfo <license_id> - look up a player's character and money".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("playerinfo")
            .description("Look up a player's info by license ID")
            .default_member_permissions(Permissions::MANAGE_MESSAGES)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "license_id",
                    "The player's license identifier",
                )
                .required(true),
            )]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_command("playerinfo") else {
            return Ok(EventHandled::No);
        };

        let license = command.str_option("license_id").unwrap_or_default().to_owned();
        command.defer_private(ctx).await?;

        let Some(url) = ctx.cfg.read().await.player_db.url.clone() else {
            let missing = Error::ConfigurationMissing("no player database is set up.".to_owned());
            command.follow_up_private(ctx, &missing.to_string()).await?;
            return Ok(EventHandled::Yes);
        };

        let row = match fetch_player(&url, &license).await {
            Ok(row) => row,
            Err(e) => {
                log_error!("Player lookup failed: {}", e);
                command
                    .follow_up_private(ctx, "Could not reach the player database.")
                    .await?;
                return Ok(EventHandled::Yes);
            }
        };

        let Some((money, charinfo)) = row else {
            command.follow_up_private(ctx, "Player not found.").await?;
            return Ok(EventHandled::Yes);
        };

        let embed = player_embed(
            &serde_json::from_str(&money)?,
            &serde_json::from_str(&charinfo)?,
            ctx.embed_color().await,
        );
        command
            .follow_up(
                ctx,
                CreateInteractionResponseFollowup::new()
                    .embed(embed)
                    .ephemeral(true),
            )
            .await?;

        Ok(EventHandled::Yes)
    }
}

/// The `(money, charinfo)` JSON columns of the player, if there is one
async fn fetch_player(url: &str, license: &str) -> Result<Option<(String, String)>> {
    let mut conn = MySqlConnection::connect(url).await?;
    let row = sqlx::query_as::<_, (String, String)>(PLAYER_QUERY)
        .bind(license)
        .fetch_optional(&mut conn)
        .await?;
    conn.close().await?;
    Ok(row)
}

/// `1234567` → `1,234,567`
fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}", sign, grouped)
}

/// A money amount as dollars with thousands separators.  Missing amounts are zero.
fn dollars(amount: Option<&Value>) -> String {
    let text = match amount {
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::String(text)) => text.clone(),
        _ => "0".to_owned(),
    };

    match text.split_once('.') {
        Some((whole, fraction)) => format!("${}.{}", group_thousands(whole), fraction),
        None => format!("${}", group_thousands(&text)),
    }
}

/// A JSON value as display text: strings without quotes, absent or null as `N/A`
fn plain(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_owned(),
        Some(Value::String(text)) if text.is_empty() => "N/A".to_owned(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn player_embed(money: &Value, charinfo: &Value, color: u32) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!(
            "👤 Player Info: {} {}",
            plain(charinfo.get("firstname")),
            plain(charinfo.get("lastname"))
        ))
        .color(color)
        .field("💰 Cash", dollars(money.get("cash")), true)
        .field("🏦 Bank", dollars(money.get("bank")), true)
        .field("🪙 Crypto", dollars(money.get("crypto")), true)
        .field("📅 Birthdate", plain(charinfo.get("birthdate")), true)
        .field("🌍 Nationality", plain(charinfo.get("nationality")), true)
        .field("📞 Phone", plain(charinfo.get("phone")), true)
        .field("📖 Backstory", plain(charinfo.get("backstory")), false)
        .footer(CreateEmbedFooter::new(format!(
            "CID: {} | Account: {}",
            plain(charinfo.get("cid")),
            plain(charinfo.get("account"))
        )))
}
