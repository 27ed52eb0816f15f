use crate::{context::Context, event::*};
use anyhow::Result;
use serenity::all::CreateCommand;

mod admin;
mod debug;
mod giveaways;
mod help;
mod ignore_bots;
mod player_lookup;
mod polls;
mod purge;
mod ready;
mod server_info;
mod sticky_note;
mod tickets;
mod verify;
mod welcome;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug and as the `[features]` key
    fn name(&self) -> &'static str;
    /// Help message line.  None if no help message
    async fn usage(&self, ctx: &Context) -> Option<String>;
    /// Slash commands this plugin answers.  Registered with the guild when ready.
    fn commands(&self) -> Vec<CreateCommand> {
        Vec::new()
    }
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ready::Ready),
        Box::new(ignore_bots::IgnoreBots),
        // Onboarding
        Box::new(welcome::Welcome),
        Box::new(verify::Verify),
        // Administration and moderation
        Box::new(admin::Admin),
        Box::new(sticky_note::StickyNote),
        Box::new(tickets::Tickets),
        Box::new(player_lookup::PlayerLookup),
        Box::new(purge::Purge),
        Box::new(server_info::ServerInfo),
        // Community engagement
        Box::new(giveaways::Giveaways),
        Box::new(polls::Polls),
        Box::new(help::Help),
    ]
}

/// Plugins not switched off under `[features]`, in order
pub async fn enabled_plugins(ctx: &Context<'_>) -> Vec<Box<dyn Plugin>> {
    let cfg = ctx.cfg.read().await;
    plugins()
        .into_iter()
        .filter(|plugin| cfg.features.is_enabled(plugin.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Features;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn plugin_names_are_unique() {
        let names: Vec<&str> = plugins().iter().map(|p| p.name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
    }

    #[test]
    fn command_names_are_unique() {
        let commands: Vec<String> = plugins()
            .iter()
            .flat_map(|p| p.commands())
            .map(|command| {
                serde_json::to_value(&command).unwrap()["name"]
                    .as_str()
                    .unwrap()
                    .to_owned()
            })
            .collect();
        let unique: HashSet<&String> = commands.iter().collect();

        assert_eq!(commands.len(), unique.len());
        for name in ["giveaway", "poll", "stickynote", "ticketpanel", "purge", "help"] {
            assert!(commands.iter().any(|c| c == name), "missing /{}", name);
        }
    }

    #[test]
    fn disabled_features_are_filtered_by_name() {
        let features = Features(HashMap::from([("purge".to_owned(), false)]));
        let enabled: Vec<&str> = plugins()
            .iter()
            .map(|p| p.name())
            .filter(|name| features.is_enabled(name))
            .collect();

        assert!(!enabled.contains(&"purge"));
        assert!(enabled.contains(&"polls"));
    }
}
