use crate::error::Error;
use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, RoleId};
use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

const TICKET_CONFIG_FILE_NAME: &str = "ticket_config.json";
const DEFAULT_DESCRIPTION: &str = "New ticket type";

/// State which persists across sessions
pub struct PersistentState {
    path: PathBuf,
    pub tickets: TicketTypes,
}

/// Ticket type name to its settings.  Names are stored lowercase.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TicketTypes(BTreeMap<String, TicketType>);

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TicketType {
    /// Category new ticket channels are created under, if any
    pub category_id: Option<ChannelId>,
    #[serde(default)]
    pub staff_roles: Vec<RoleId>,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub require_reason: bool,
    #[serde(default)]
    pub close_permission: ClosePermission,
}

/// Who may close a ticket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosePermission {
    #[default]
    Staff,
    Anyone,
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_owned()
}

impl std::fmt::Display for ClosePermission {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ClosePermission::Staff => write!(f, "staff"),
            ClosePermission::Anyone => write!(f, "anyone"),
        }
    }
}

/// Channel-name form of a ticket type name
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

impl PersistentState {
    fn state_path() -> Result<PathBuf> {
        crate::config::config_dir().map(|p| p.join(TICKET_CONFIG_FILE_NAME))
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(Self::state_path()?).await
    }

    /// A missing file is an empty ticket configuration
    pub async fn load_from(path: PathBuf) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    tickets: TicketTypes::default(),
                })
            }
            Err(e) => {
                return Err(anyhow!(
                    "Could not read ticket configuration at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        let tickets: TicketTypes = serde_json::from_str(&contents).map_err(|e| {
            anyhow!(
                "Could not parse ticket configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Ok(Self { path, tickets })
    }

    pub async fn reload(&mut self) -> Result<()> {
        *self = Self::load_from(self.path.clone()).await?;
        Ok(())
    }

    /// Rewrite the whole document
    pub async fn save(&self) -> Result<()> {
        let path = &self.path;
        let contents = serde_json::to_string_pretty(&self.tickets)
            .map_err(|e| anyhow!("Could not serialize ticket configuration: {}", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow!(
                    "Could not create directory `{}`: {}",
                    parent.to_string_lossy(),
                    e
                )
            })?;
        }

        // Create a temporary file in the same directory.
        let tmp_path = path.with_extension("json.new");

        tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
            anyhow!(
                "Could not write ticket configuration to temporary file `{}`: {}",
                tmp_path.to_string_lossy(),
                e
            )
        })?;

        // Atomically rename the temporary file over the target file.
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            anyhow!(
                "Could not rename temporary file `{}` to `{}`: {}",
                tmp_path.to_string_lossy(),
                path.to_string_lossy(),
                e
            )
        })?;

        Ok(())
    }
}

impl TicketTypes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TicketType)> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TicketType> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut TicketType, Error> {
        self.0
            .get_mut(name)
            .ok_or_else(|| Error::ConfigurationMissing(format!("ticket type `{}`", name)))
    }

    /// Add a type with default settings, returning its stored name
    pub fn add(&mut self, name: &str) -> Result<String, Error> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "A ticket type needs a name.".to_owned(),
            ));
        }
        if self.0.contains_key(&name) {
            return Err(Error::InvalidInput(
                "That ticket type already exists!".to_owned(),
            ));
        }

        self.0.insert(
            name.clone(),
            TicketType {
                category_id: None,
                staff_roles: Vec::new(),
                description: default_description(),
                require_reason: false,
                close_permission: ClosePermission::Staff,
            },
        );
        Ok(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<TicketType, Error> {
        self.0
            .remove(name)
            .ok_or_else(|| Error::ConfigurationMissing(format!("ticket type `{}`", name)))
    }

    /// The ticket type a ticket channel belongs to: the longest slug such that the channel name
    /// starts with `<slug>-`.
    pub fn resolve(&self, channel_name: &str) -> Result<(&str, &TicketType), Error> {
        self.0
            .iter()
            .filter(|(name, _)| {
                channel_name
                    .strip_prefix(slugify(name).as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
            })
            .max_by_key(|(name, _)| slugify(name).len())
            .map(|(name, settings)| (name.as_str(), settings))
            .ok_or_else(|| Error::ConfigurationMissing("Could not identify ticket type.".to_owned()))
    }
}

impl TicketType {
    pub fn is_staff(&self, roles: &[RoleId]) -> bool {
        self.staff_roles.iter().any(|role| roles.contains(role))
    }

    pub fn can_close(&self, roles: &[RoleId]) -> bool {
        match self.close_permission {
            ClosePermission::Anyone => true,
            ClosePermission::Staff => self.is_staff(roles),
        }
    }

    pub fn toggle_close_permission(&mut self) -> ClosePermission {
        self.close_permission = match self.close_permission {
            ClosePermission::Staff => ClosePermission::Anyone,
            ClosePermission::Anyone => ClosePermission::Staff,
        };
        self.close_permission
    }

    pub fn toggle_require_reason(&mut self) -> bool {
        self.require_reason = !self.require_reason;
        self.require_reason
    }

    /// Multi-line description for the configuration panel
    pub fn summary(&self) -> String {
        let category = match self.category_id {
            Some(id) => format!("<#{}>", id),
            None => "None".to_owned(),
        };
        let roles = if self.staff_roles.is_empty() {
            "None".to_owned()
        } else {
            self.staff_roles
                .iter()
                .map(|id| format!("<@&{}>", id))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "**Description:** {}\n\
             **Category:** {}\n\
             **Staff Roles:** {}\n\
             **Close Permission:** {}\n\
             **Require Reason:** {}",
            self.description,
            category,
            roles,
            self.close_permission,
            if self.require_reason { "yes" } else { "no" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(names: &[&str]) -> TicketTypes {
        let mut types = TicketTypes::default();
        for name in names {
            types.add(name).unwrap();
        }
        types
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Player Report"), "player-report");
        assert_eq!(slugify("general"), "general");
    }

    #[test]
    fn add_normalizes_and_rejects_duplicates() {
        let mut t = TicketTypes::default();

        assert_eq!(t.add("  Donator ").unwrap(), "donator");
        assert_eq!(
            t.add("DONATOR"),
            Err(Error::InvalidInput("That ticket type already exists!".into()))
        );
        assert!(t.add(" ").is_err());

        let donator = t.get("donator").unwrap();
        assert_eq!(donator.description, "New ticket type");
        assert_eq!(donator.close_permission, ClosePermission::Staff);
        assert!(!donator.require_reason);
    }

    #[test]
    fn resolve_prefers_longest_slug() {
        let t = types(&["player", "player report", "general"]);

        assert_eq!(t.resolve("player-report-123").unwrap().0, "player report");
        assert_eq!(t.resolve("player-123").unwrap().0, "player");
        assert_eq!(t.resolve("general-9").unwrap().0, "general");
        assert!(matches!(
            t.resolve("generalchat"),
            Err(Error::ConfigurationMissing(_))
        ));
        assert!(t.resolve("support-1").is_err());
    }

    #[test]
    fn close_permission_modes() {
        let mut t = types(&["general"]);
        let settings = t.get_mut("general").unwrap();
        settings.staff_roles = vec![RoleId::new(5)];

        assert!(settings.is_staff(&[RoleId::new(1), RoleId::new(5)]));
        assert!(!settings.can_close(&[RoleId::new(1)]));

        assert_eq!(settings.toggle_close_permission(), ClosePermission::Anyone);
        assert!(settings.can_close(&[]));
        assert_eq!(settings.toggle_close_permission(), ClosePermission::Staff);

        assert!(settings.toggle_require_reason());
        assert!(!settings.toggle_require_reason());
    }

    #[test]
    fn parses_stored_layout() {
        let json = r#"{
            "general": {
                "category_id": 1407745744852488307,
                "staff_roles": [11, 12],
                "description": "General help",
                "require_reason": true,
                "close_permission": "anyone"
            },
            "donator": {
                "category_id": null,
                "staff_roles": [],
                "description": "Store"
            }
        }"#;

        let t: TicketTypes = serde_json::from_str(json).unwrap();
        let general = t.get("general").unwrap();
        assert_eq!(general.category_id, Some(ChannelId::new(1407745744852488307)));
        assert_eq!(general.close_permission, ClosePermission::Anyone);
        assert!(general.require_reason);

        let donator = t.get("donator").unwrap();
        assert_eq!(donator.close_permission, ClosePermission::Staff);
        assert!(!donator.require_reason);
    }

    #[tokio::test]
    async fn missing_file_is_empty_and_saves_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(TICKET_CONFIG_FILE_NAME);

        let mut state = PersistentState::load_from(path.clone()).await.unwrap();
        assert!(state.tickets.is_empty());

        state.tickets.add("general").unwrap();
        state.tickets.get_mut("general").unwrap().staff_roles = vec![RoleId::new(3)];
        state.save().await.unwrap();

        assert!(!path.with_extension("json.new").exists());
        let reloaded = PersistentState::load_from(path).await.unwrap();
        assert_eq!(reloaded.tickets, state.tickets);
    }

    #[tokio::test]
    async fn save_overwrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TICKET_CONFIG_FILE_NAME);

        let mut state = PersistentState::load_from(path.clone()).await.unwrap();
        state.tickets.add("general").unwrap();
        state.tickets.add("donator").unwrap();
        state.save().await.unwrap();

        state.tickets.remove("general").unwrap();
        state.save().await.unwrap();

        let mut reloaded = PersistentState::load_from(path).await.unwrap();
        assert!(reloaded.tickets.get("general").is_none());
        assert!(reloaded.tickets.get("donator").is_some());

        reloaded.reload().await.unwrap();
        assert_eq!(reloaded.tickets.iter().count(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TICKET_CONFIG_FILE_NAME);
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = PersistentState::load_from(path).await.err().unwrap();
        assert!(err.to_string().contains("Could not parse ticket configuration"));
    }
}
