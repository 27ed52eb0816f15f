use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, GuildId, RoleId, UserId};
use std::{collections::HashMap, path::PathBuf};
use tokio::io::AsyncReadExt;

const CONFIG_DIR_REL_HOME: &str = ".config/stewardbot";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub features: Features,
    pub welcome: Welcome,
    pub verify: Verify,
    pub tickets: Tickets,
    #[serde(default)]
    pub polls: Polls,
    #[serde(default)]
    pub player_db: PlayerDb,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    /// The single community server the bot serves.  Slash commands are registered here.
    pub guild_id: GuildId,
    pub embed_color: u32,
    pub community_name: String,
    /// IANA name, e.g. `Australia/Sydney`
    pub timezone: String,
}

/// Plugin name to enabled flag.  Plugins missing from the table are enabled.
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Features(pub HashMap<String, bool>);

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Welcome {
    pub channel_id: Option<ChannelId>,
    pub image_url: Option<String>,
    pub rules_channel_id: Option<ChannelId>,
    pub allowlist_channel_id: Option<ChannelId>,
    pub connect_channel_id: Option<ChannelId>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Verify {
    pub log_channel_id: ChannelId,
    pub public_log_channel_id: Option<ChannelId>,
    pub verified_role_id: RoleId,
    pub approved_image_url: Option<String>,
    pub denied_image_url: Option<String>,
    #[serde(default)]
    pub blacklist: Vec<UserId>,
    #[serde(default = "default_retry_cooldown_seconds")]
    pub retry_cooldown_seconds: u64,
    #[serde(default)]
    pub panel_description: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Tickets {
    pub log_channel_id: Option<ChannelId>,
    #[serde(default = "default_close_delay_seconds")]
    pub close_delay_seconds: u64,
    #[serde(default)]
    pub panel_description: String,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Polls {
    /// Restrict poll creation to members who can manage messages or the server.
    #[serde(default)]
    pub only_moderators: bool,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct PlayerDb {
    /// MySQL connection url.  Player lookups are unavailable without it.
    pub url: Option<String>,
}

fn default_retry_cooldown_seconds() -> u64 {
    600
}

fn default_close_delay_seconds() -> u64 {
    5
}

/// Directory holding the configuration and the ticket configuration
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(CONFIG_DIR_REL_HOME))
        .ok_or(anyhow!("Could not find home directory"))
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }
}

impl Features {
    pub fn is_enabled(&self, plugin_name: &str) -> bool {
        self.0.get(plugin_name).copied().unwrap_or(true)
    }
}

impl General {
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[general]
discord_token = "token"
guild_id = 1311949979325038600
embed_color = 0x5865F2
community_name = "SiliconRP"
timezone = "Australia/Sydney"

[features]
purge = false

[welcome]
channel_id = 1407745744852488307

[verify]
log_channel_id = 1407745749990768812
verified_role_id = 1407745719258972220
blacklist = [42]

[tickets]
log_channel_id = 1407745749990768813
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = Config::parse(SAMPLE).unwrap();

        assert_eq!(cfg.general.community_name, "SiliconRP");
        assert_eq!(cfg.general.embed_color, 0x5865F2);
        assert_eq!(cfg.general.tz(), chrono_tz::Australia::Sydney);
        assert_eq!(cfg.verify.retry_cooldown_seconds, 600);
        assert_eq!(cfg.verify.blacklist, vec![UserId::new(42)]);
        assert_eq!(cfg.tickets.close_delay_seconds, 5);
        assert!(!cfg.polls.only_moderators);
        assert!(cfg.player_db.url.is_none());
        assert!(cfg.welcome.image_url.is_none());
    }

    #[test]
    fn missing_features_are_enabled() {
        let cfg = Config::parse(SAMPLE).unwrap();

        assert!(!cfg.features.is_enabled("purge"));
        assert!(cfg.features.is_enabled("giveaways"));
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let mut cfg = Config::parse(SAMPLE).unwrap();
        cfg.general.timezone = "Mars/Olympus_Mons".to_owned();

        assert_eq!(cfg.general.tz(), chrono_tz::UTC);
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(Config::parse("[general]\ndiscord_token = \"x\"\n").is_err());
    }
}
