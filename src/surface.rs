//! Outbound side of the platform.  Sessions and sticky notes render into a [`Frame`] and hand it
//! to a [`Surface`], which in production is the serenity HTTP client.

use anyhow::Result;
use serenity::all::{
    ButtonStyle, ChannelId, CreateActionRow, CreateAllowedMentions, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateMessage, EditMessage, Http, MessageId,
};

/// Buttons per action row is capped by Discord
const BUTTONS_PER_ROW: usize = 5;

/// A posted message, addressable for edits, replies and deletion
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Platform-neutral rendering of an embed plus its interactive controls
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<Field>,
    pub footer: Option<String>,
    pub controls: Vec<Control>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Control {
    pub custom_id: String,
    pub label: String,
    pub style: ControlStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlStyle {
    Primary,
    Success,
    Danger,
}

impl Frame {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            color,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn control(
        mut self,
        custom_id: impl Into<String>,
        label: impl Into<String>,
        style: ControlStyle,
    ) -> Self {
        self.controls.push(Control {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
        });
        self
    }

    pub fn embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new().title(&self.title).color(self.color);
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        for field in &self.fields {
            embed = embed.field(&field.name, &field.value, field.inline);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        embed
    }

    /// Controls laid out left to right, top to bottom.  Empty when the frame is not interactive,
    /// which also strips controls from an edited message.
    pub fn components(&self) -> Vec<CreateActionRow> {
        self.controls
            .chunks(BUTTONS_PER_ROW)
            .map(|row| {
                CreateActionRow::Buttons(
                    row.iter()
                        .map(|control| {
                            CreateButton::new(&control.custom_id)
                                .label(&control.label)
                                .style(match control.style {
                                    ControlStyle::Primary => ButtonStyle::Primary,
                                    ControlStyle::Success => ButtonStyle::Success,
                                    ControlStyle::Danger => ButtonStyle::Danger,
                                })
                        })
                        .collect(),
                )
            })
            .collect()
    }
}

/// Outbound platform calls.  Every call is a suspension point and may fail transiently.
#[serenity::async_trait]
pub trait Surface: Send + Sync + 'static {
    /// Post a frame as a new message
    async fn post(&self, channel_id: ChannelId, frame: &Frame) -> Result<MessageRef>;
    /// Replace the content and controls of a posted message
    async fn edit(&self, target: MessageRef, frame: &Frame) -> Result<()>;
    /// Post plain text as a new message
    async fn say(&self, channel_id: ChannelId, content: &str) -> Result<MessageRef>;
    /// Reply to a posted message without pinging its author
    async fn reply(&self, target: MessageRef, content: &str) -> Result<()>;
    async fn delete(&self, target: MessageRef) -> Result<()>;
}

#[serenity::async_trait]
impl Surface for Http {
    async fn post(&self, channel_id: ChannelId, frame: &Frame) -> Result<MessageRef> {
        let message = CreateMessage::new()
            .embed(frame.embed())
            .components(frame.components());
        let msg = channel_id.send_message(self, message).await?;
        Ok(MessageRef {
            channel_id: msg.channel_id,
            message_id: msg.id,
        })
    }

    async fn edit(&self, target: MessageRef, frame: &Frame) -> Result<()> {
        let edit = EditMessage::new()
            .embed(frame.embed())
            .components(frame.components());
        target
            .channel_id
            .edit_message(self, target.message_id, edit)
            .await?;
        Ok(())
    }

    async fn say(&self, channel_id: ChannelId, content: &str) -> Result<MessageRef> {
        let msg = channel_id
            .send_message(self, CreateMessage::new().content(content))
            .await?;
        Ok(MessageRef {
            channel_id: msg.channel_id,
            message_id: msg.id,
        })
    }

    async fn reply(&self, target: MessageRef, content: &str) -> Result<()> {
        let message = CreateMessage::new()
            .content(content)
            .reference_message((target.channel_id, target.message_id))
            .allowed_mentions(
                CreateAllowedMentions::new()
                    .all_users(true)
                    .replied_user(false),
            );
        target.channel_id.send_message(self, message).await?;
        Ok(())
    }

    async fn delete(&self, target: MessageRef) -> Result<()> {
        target
            .channel_id
            .delete_message(self, target.message_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory surface recording every call

    use super::*;
    use anyhow::anyhow;
    use std::sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    };

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Post(MessageRef, Frame),
        Edit(MessageRef, Frame),
        Say(MessageRef, String),
        Reply(MessageRef, String),
        Delete(MessageRef),
    }

    #[derive(Default)]
    pub struct FakeSurface {
        pub calls: Mutex<Vec<Call>>,
        next_id: AtomicU64,
        /// Makes posts, edits and deletes fail, as if the channel or message were gone
        pub failing: AtomicBool,
    }

    impl FakeSurface {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn edits(&self) -> Vec<Frame> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Edit(_, frame) => Some(frame),
                    _ => None,
                })
                .collect()
        }

        pub fn replies(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Reply(_, content) => Some(content),
                    _ => None,
                })
                .collect()
        }

        fn allocate(&self, channel_id: ChannelId) -> MessageRef {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            MessageRef {
                channel_id,
                message_id: MessageId::new(id),
            }
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(anyhow!("Unknown Message"))
            } else {
                Ok(())
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[serenity::async_trait]
    impl Surface for FakeSurface {
        async fn post(&self, channel_id: ChannelId, frame: &Frame) -> Result<MessageRef> {
            self.check()?;
            let target = self.allocate(channel_id);
            self.record(Call::Post(target, frame.clone()));
            Ok(target)
        }

        async fn edit(&self, target: MessageRef, frame: &Frame) -> Result<()> {
            self.check()?;
            self.record(Call::Edit(target, frame.clone()));
            Ok(())
        }

        async fn say(&self, channel_id: ChannelId, content: &str) -> Result<MessageRef> {
            let target = self.allocate(channel_id);
            self.record(Call::Say(target, content.to_owned()));
            Ok(target)
        }

        async fn reply(&self, target: MessageRef, content: &str) -> Result<()> {
            self.record(Call::Reply(target, content.to_owned()));
            Ok(())
        }

        async fn delete(&self, target: MessageRef) -> Result<()> {
            self.check()?;
            self.record(Call::Delete(target));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_wrap_into_rows_of_five() {
        let mut frame = Frame::new("t", 0);
        for i in 0..7 {
            frame = frame.control(format!("id:{}", i), format!("{}", i), ControlStyle::Primary);
        }

        assert_eq!(frame.components().len(), 2);
        assert!(Frame::new("t", 0).components().is_empty());
    }
}
