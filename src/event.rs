//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum.

use crate::{
    context::Context,
    helper::CustomId,
    log_error,
};
use serenity::all::{
    CommandInteraction, ComponentInteraction, Member, Message, ModalInteraction, Ready,
};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
    /// Slash command invocation
    Command(CommandInteraction),
    /// Button press or select menu choice
    Component(ComponentInteraction),
    /// Modal submission
    Modal(ModalInteraction),
    MemberJoin(Member),
}

impl Event {
    // When an event occurs, iterate over the enabled plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::enabled_plugins(&ctx).await {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => log_error!("Error in plugin {}: {}", plugin.name(), err),
            }
        }
    }

    /// The invocation of slash command `name`, if that is what this event is
    pub fn is_command(&self, name: &str) -> Option<&CommandInteraction> {
        match self {
            Event::Command(command) if command.data.name == name => Some(command),
            _ => None,
        }
    }

    /// A component interaction whose custom id lies in `namespace`
    pub fn is_component(&self, namespace: &str) -> Option<(&ComponentInteraction, CustomId<'_>)> {
        let Event::Component(component) = self else {
            return None;
        };

        CustomId::parse(&component.data.custom_id)
            .filter(|id| id.namespace == namespace)
            .map(|id| (component, id))
    }

    /// A modal submission whose custom id lies in `namespace`
    pub fn is_modal(&self, namespace: &str) -> Option<(&ModalInteraction, CustomId<'_>)> {
        let Event::Modal(modal) = self else {
            return None;
        };

        CustomId::parse(&modal.data.custom_id)
            .filter(|id| id.namespace == namespace)
            .map(|id| (modal, id))
    }
}

pub enum EventHandled {
    Yes,
    No,
}
