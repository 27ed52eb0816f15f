use crate::{
    log_error,
    session::{giveaway::Giveaway, poll::Poll, Registry},
    surface::{MessageRef, Surface},
};
use anyhow::Result;
use serenity::all::{ChannelId, UserId};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

const NOTE_HEADER: &str = "**⚠ Important Message Please Read ⚠**";

/// State which is lost across sessions
pub struct VolatileState {
    pub giveaways: Registry<Giveaway>,
    pub polls: Registry<Poll>,
    pub sticky_notes: StickyNotes,
    pub verify_cooldowns: Cooldowns,
}

impl VolatileState {
    pub async fn new() -> Self {
        Self {
            giveaways: Registry::new(),
            polls: Registry::new(),
            sticky_notes: StickyNotes::default(),
            verify_cooldowns: Cooldowns::new(),
        }
    }

    /// Stop every session's refresh task
    pub async fn shutdown(&self) {
        self.giveaways.shutdown().await;
        self.polls.shutdown().await;
    }
}

/// At most one note per channel, kept as the channel's latest message.  Cloning shares the notes.
#[derive(Clone, Default)]
pub struct StickyNotes {
    channels: Arc<Mutex<HashMap<ChannelId, Arc<Mutex<Option<Note>>>>>>,
}

struct Note {
    content: String,
    posted: Option<MessageRef>,
}

fn format_note(content: &str) -> String {
    format!("{}\n\n{}", NOTE_HEADER, content)
}

impl StickyNotes {
    /// The channel's slot, created on first use.  Holding a slot's lock serializes every note
    /// operation in that channel.
    async fn slot(&self, channel_id: ChannelId) -> Arc<Mutex<Option<Note>>> {
        Arc::clone(self.channels.lock().await.entry(channel_id).or_default())
    }

    async fn existing_slot(&self, channel_id: ChannelId) -> Option<Arc<Mutex<Option<Note>>>> {
        self.channels.lock().await.get(&channel_id).map(Arc::clone)
    }

    /// Replace the channel's note, deleting the previously posted one
    pub async fn set<S: Surface + ?Sized>(
        &self,
        channel_id: ChannelId,
        content: String,
        surface: &S,
    ) -> Result<()> {
        let slot = self.slot(channel_id).await;
        let mut note = slot.lock().await;

        if let Some(old) = note.as_ref().and_then(|note| note.posted) {
            if let Err(e) = surface.delete(old).await {
                log_error!("Could not delete old sticky note: {}", e);
            }
        }

        // Active even if posting fails; the next message reposts it
        let posted = surface.say(channel_id, &format_note(&content)).await;
        *note = Some(Note {
            content,
            posted: posted.as_ref().ok().copied(),
        });

        posted.map(|_| ())
    }

    /// Remove the channel's note.  Returns false if there was none.
    pub async fn clear<S: Surface + ?Sized>(&self, channel_id: ChannelId, surface: &S) -> bool {
        let Some(slot) = self.existing_slot(channel_id).await else {
            return false;
        };
        let mut note = slot.lock().await;

        let old = note.take();
        if let Some(posted) = old.as_ref().and_then(|old| old.posted) {
            if let Err(e) = surface.delete(posted).await {
                log_error!("Could not delete sticky note: {}", e);
            }
        }
        self.forget_idle(channel_id, &slot).await;

        old.is_some()
    }

    /// Drop an empty slot unless another operation is already queued on it.  Call with the slot
    /// locked.
    async fn forget_idle(&self, channel_id: ChannelId, slot: &Arc<Mutex<Option<Note>>>) {
        let mut channels = self.channels.lock().await;
        // One reference in the map, one held by the caller
        if Arc::strong_count(slot) == 2 {
            channels.remove(&channel_id);
        }
    }

    /// Move the channel's note, if any, back below the newest message.  Failures are logged and
    /// the note stays active.  Returns whether the channel has a note.
    pub async fn on_message<S: Surface + ?Sized>(&self, channel_id: ChannelId, surface: &S) -> bool {
        let Some(slot) = self.existing_slot(channel_id).await else {
            return false;
        };
        let mut guard = slot.lock().await;
        let Some(note) = guard.as_mut() else {
            return false;
        };

        if let Some(old) = note.posted.take() {
            if let Err(e) = surface.delete(old).await {
                log_error!("Could not delete old sticky note: {}", e);
            }
        }

        match surface.say(channel_id, &format_note(&note.content)).await {
            Ok(posted) => note.posted = Some(posted),
            Err(e) => log_error!("Could not repost sticky note: {}", e),
        }

        true
    }
}

/// Per-user wait before an action may be retried
pub struct Cooldowns(HashMap<UserId, Instant>);

impl Cooldowns {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn start(&mut self, id: UserId, duration: Duration) {
        self.0.insert(id, Instant::now() + duration);
    }

    /// Time left before `id` may retry, if any
    pub fn remaining(&self, id: UserId) -> Option<Duration> {
        let now = Instant::now();
        self.0
            .get(&id)
            .filter(|until| **until > now)
            .map(|until| *until - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::fake::{Call, FakeSurface};

    const CHANNEL: ChannelId = ChannelId::new(7);

    fn says(surface: &FakeSurface) -> Vec<(MessageRef, String)> {
        surface
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Say(target, content) => Some((target, content)),
                _ => None,
            })
            .collect()
    }

    fn deletes(surface: &FakeSurface) -> Vec<MessageRef> {
        surface
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn setting_twice_replaces_the_posted_note() {
        let surface = FakeSurface::default();
        let notes = StickyNotes::default();

        notes.set(CHANNEL, "first".into(), &surface).await.unwrap();
        notes.set(CHANNEL, "second".into(), &surface).await.unwrap();

        let posted = says(&surface);
        assert_eq!(posted.len(), 2);
        assert_eq!(
            posted[1].1,
            "**⚠ Important Message Please Read ⚠**\n\nsecond"
        );
        assert_eq!(deletes(&surface), vec![posted[0].0]);
    }

    #[tokio::test]
    async fn messages_move_the_note_down() {
        let surface = FakeSurface::default();
        let notes = StickyNotes::default();

        assert!(!notes.on_message(CHANNEL, &surface).await);
        assert!(surface.calls().is_empty());

        notes.set(CHANNEL, "read me".into(), &surface).await.unwrap();
        assert!(notes.on_message(CHANNEL, &surface).await);
        assert!(notes.on_message(CHANNEL, &surface).await);

        let posted = says(&surface);
        assert_eq!(posted.len(), 3);
        assert!(posted.iter().all(|(_, text)| text.ends_with("read me")));
        assert_eq!(deletes(&surface), vec![posted[0].0, posted[1].0]);
    }

    #[tokio::test]
    async fn failed_delete_still_reposts() {
        let surface = FakeSurface::default();
        let notes = StickyNotes::default();
        notes.set(CHANNEL, "note".into(), &surface).await.unwrap();

        surface.set_failing(true);
        assert!(notes.on_message(CHANNEL, &surface).await);
        surface.set_failing(false);

        assert_eq!(says(&surface).len(), 2);
        // The lock was released despite the failure
        assert!(notes.on_message(CHANNEL, &surface).await);
        assert_eq!(says(&surface).len(), 3);
    }

    #[tokio::test]
    async fn clearing_removes_note() {
        let surface = FakeSurface::default();
        let notes = StickyNotes::default();

        assert!(!notes.clear(CHANNEL, &surface).await);

        notes.set(CHANNEL, "note".into(), &surface).await.unwrap();
        assert!(notes.clear(CHANNEL, &surface).await);
        assert_eq!(deletes(&surface).len(), 1);

        assert!(!notes.on_message(CHANNEL, &surface).await);
        assert!(!notes.clear(CHANNEL, &surface).await);
        assert_eq!(says(&surface).len(), 1);
        assert!(notes.channels.lock().await.is_empty());
    }

    #[tokio::test]
    async fn clearing_keeps_a_slot_someone_is_waiting_on() {
        let surface = FakeSurface::default();
        let notes = StickyNotes::default();
        notes.set(CHANNEL, "note".into(), &surface).await.unwrap();

        let waiting = notes.slot(CHANNEL).await;
        assert!(notes.clear(CHANNEL, &surface).await);
        assert!(notes.channels.lock().await.contains_key(&CHANNEL));

        drop(waiting);
        notes.set(CHANNEL, "again".into(), &surface).await.unwrap();
        assert!(notes.clear(CHANNEL, &surface).await);
        assert!(notes.channels.lock().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_reposts_leave_one_note() {
        let surface = FakeSurface::default();
        let notes = StickyNotes::default();
        notes.set(CHANNEL, "note".into(), &surface).await.unwrap();

        tokio::join!(
            notes.on_message(CHANNEL, &surface),
            notes.on_message(CHANNEL, &surface),
            notes.on_message(CHANNEL, &surface),
        );

        let posted = says(&surface);
        let deleted = deletes(&surface);
        assert_eq!(posted.len(), 4);
        assert_eq!(deleted.len(), 3);
        let live: Vec<_> = posted
            .iter()
            .filter(|(target, _)| !deleted.contains(target))
            .collect();
        assert_eq!(live.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expires() {
        let mut cooldowns = Cooldowns::new();
        let user = UserId::new(3);

        assert_eq!(cooldowns.remaining(user), None);

        cooldowns.start(user, Duration::from_secs(600));
        assert_eq!(cooldowns.remaining(user), Some(Duration::from_secs(600)));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(cooldowns.remaining(user), Some(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cooldowns.remaining(user), None);
    }
}
