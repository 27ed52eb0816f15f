use super::{Actor, Engagement, Registry, Resolution, Session, SessionId, Tick};
use crate::{
    error::{Error, Result},
    log_error, log_internal,
    logging::PrintColor,
    surface::{MessageRef, Surface},
};
use rand::{rngs::StdRng, SeedableRng};
use serenity::all::ChannelId;
use std::sync::Arc;
use tokio::time::Instant;

/// Register a session, start its refresh task, post its first frame and bind the session to
/// the posted message.  If posting fails the session is dropped again.
pub async fn launch<E, S>(
    registry: &Registry<E>,
    session: Session<E>,
    channel_id: ChannelId,
    surface: Arc<S>,
) -> anyhow::Result<MessageRef>
where
    E: Engagement,
    S: Surface + ?Sized,
{
    let id = session.id();
    let creator = session.creator();
    let frame = session.render(Instant::now());
    let handle = registry.insert(session).await;

    let task = tokio::spawn(refresh(registry.clone(), id, Arc::clone(&surface)));
    registry.attach(id, task).await;

    let target = match surface.post(channel_id, &frame).await {
        Ok(target) => target,
        Err(e) => {
            registry.remove(id).await;
            return Err(e);
        }
    };

    handle.lock().await.bind(target);
    log_internal!(
        "Session {} opened by {} as message {}",
        id.color(),
        creator,
        target.message_id
    );

    Ok(target)
}

/// Feed one participation event into a session and push the re-rendered frame.  A failed push
/// does not undo the participation.
///
/// The session stays locked until the push completes, so a slow edit can never land on top of
/// the final display.
pub async fn participate<E, S>(
    registry: &Registry<E>,
    id: SessionId,
    actor: Actor,
    action: E::Action,
    surface: &S,
) -> Result<E::Ack>
where
    E: Engagement,
    S: Surface + ?Sized,
{
    let handle = registry.get(id).await.ok_or(Error::UnknownSession)?;
    let mut session = handle.lock().await;
    let (ack, update) = session.participate(actor, action, Instant::now())?;

    if let Some((target, frame)) = update {
        if let Err(e) = surface.edit(target, &frame).await {
            log_error!("Could not update session {}: {}", id.color(), e);
        }
    }
    drop(session);

    Ok(ack)
}

/// The refresh task.  Owns the session's continued scheduling and removes the session from the
/// registry when it ends.
async fn refresh<E, S>(registry: Registry<E>, id: SessionId, surface: Arc<S>)
where
    E: Engagement,
    S: Surface + ?Sized,
{
    let mut rng = StdRng::from_entropy();

    loop {
        let Some(handle) = registry.get(id).await else {
            return;
        };
        // Edits are pushed under the lock so frames reach the message in state order
        let mut session = handle.lock().await;
        let tick = session.tick(Instant::now(), &mut rng);

        match tick {
            Tick::Unbound { retry_in } => {
                drop(session);
                tokio::time::sleep(retry_in).await;
            }
            Tick::Refresh {
                target,
                frame,
                next_in,
            } => {
                if let Err(e) = surface.edit(target, &frame).await {
                    log_error!("Could not refresh session {}: {}", id.color(), e);
                }
                drop(session);
                tokio::time::sleep(next_in).await;
            }
            Tick::Resolved { target, resolution } => {
                finish(id, target, resolution, surface.as_ref()).await;
                break;
            }
            Tick::Abandoned => {
                log_error!("Session {} was never posted; abandoning it", id.color());
                break;
            }
            Tick::Closed => break,
        }
    }

    registry.remove(id).await;
}

async fn finish<S: Surface + ?Sized>(
    id: SessionId,
    target: MessageRef,
    resolution: Resolution,
    surface: &S,
) {
    log_internal!("Session {} resolved", id.color());

    if let Err(e) = surface.edit(target, &resolution.frame).await {
        log_error!("Could not show result of session {}: {}", id.color(), e);
    }

    if let Some(announcement) = resolution.announcement {
        if let Err(e) = surface.reply(target, &announcement).await {
            log_error!("Could not announce result of session {}: {}", id.color(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        giveaway::{Giveaway, GiveawayAck, GiveawayAction},
        poll::{Poll, Vote},
        test_support::actor,
        SessionState,
    };
    use super::*;
    use crate::{
        duration::parse_duration,
        surface::{
            fake::{Call, FakeSurface},
            Frame,
        },
    };
    use serenity::all::UserId;
    use std::time::Duration;

    const CHANNEL: ChannelId = ChannelId::new(100);

    async fn settle() {
        // Let the refresh task run up to its next sleep
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(secs: u64) {
        tokio::time::advance(Duration::from_secs(secs)).await;
        settle().await;
    }

    fn entries_shown(frame: &crate::surface::Frame) -> String {
        frame
            .description
            .as_deref()
            .unwrap()
            .lines()
            .last()
            .unwrap()
            .to_owned()
    }

    #[tokio::test(start_paused = true)]
    async fn giveaway_end_to_end() {
        let surface = Arc::new(FakeSurface::default());
        let registry = Registry::new();

        let seconds = parse_duration("10m").unwrap();
        let giveaway = Giveaway::new(UserId::new(1), "Car", None, 1, 0).unwrap();
        let session = Session::new(UserId::new(1), seconds, Instant::now(), giveaway);
        let id = session.id();
        let target = launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .unwrap();
        settle().await;

        for user in [5, 6] {
            let ack = participate(&registry, id, actor(user), GiveawayAction::Enter, &*surface)
                .await
                .unwrap();
            assert_eq!(ack, GiveawayAck::Entered);
        }
        let last_open = surface.edits().last().cloned().unwrap();
        assert_eq!(entries_shown(&last_open), "**Entries so far:** 2");

        advance(seconds).await;

        let replies = surface.replies();
        assert_eq!(replies.len(), 1);
        let five = replies[0].contains("<@5>");
        let six = replies[0].contains("<@6>");
        assert!(five ^ six, "exactly one winner expected: {}", replies[0]);

        let last = surface.calls().into_iter().rev().find_map(|call| match call {
            Call::Edit(t, frame) => Some((t, frame)),
            _ => None,
        });
        let (t, frame) = last.unwrap();
        assert_eq!(t, target);
        assert_eq!(frame.title, "Giveaway Ended");
        assert!(frame.controls.is_empty());

        assert!(registry.get(id).await.is_none());
        assert_eq!(
            participate(&registry, id, actor(7), GiveawayAction::Enter, &*surface).await,
            Err(Error::UnknownSession)
        );
    }

    /// Surface whose open-frame edits take a while to go through
    #[derive(Default)]
    struct SlowSurface {
        inner: FakeSurface,
    }

    #[serenity::async_trait]
    impl Surface for SlowSurface {
        async fn post(&self, channel_id: ChannelId, frame: &Frame) -> anyhow::Result<MessageRef> {
            self.inner.post(channel_id, frame).await
        }

        async fn edit(&self, target: MessageRef, frame: &Frame) -> anyhow::Result<()> {
            if !frame.controls.is_empty() {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            self.inner.edit(target, frame).await
        }

        async fn say(&self, channel_id: ChannelId, content: &str) -> anyhow::Result<MessageRef> {
            self.inner.say(channel_id, content).await
        }

        async fn reply(&self, target: MessageRef, content: &str) -> anyhow::Result<()> {
            self.inner.reply(target, content).await
        }

        async fn delete(&self, target: MessageRef) -> anyhow::Result<()> {
            self.inner.delete(target).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_entry_edit_does_not_reopen_ended_giveaway() {
        let surface = Arc::new(SlowSurface::default());
        let registry = Registry::new();
        let giveaway = Giveaway::new(UserId::new(1), "Car", None, 1, 0).unwrap();
        let session = Session::new(UserId::new(1), 60, Instant::now(), giveaway);
        let id = session.id();

        launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .unwrap();
        advance(58).await;

        // Entering two seconds before the end; the edit completes after expiry
        let entering = {
            let registry = registry.clone();
            let surface = Arc::clone(&surface);
            tokio::spawn(async move {
                participate(&registry, id, actor(5), GiveawayAction::Enter, &*surface).await
            })
        };
        assert_eq!(entering.await.unwrap(), Ok(GiveawayAck::Entered));
        advance(5).await;

        let last = surface.inner.edits().last().cloned().unwrap();
        assert_eq!(last.title, "Giveaway Ended");
        assert!(last.controls.is_empty());
        assert_eq!(surface.inner.replies().len(), 1);
        assert!(surface.inner.replies()[0].contains("<@5>"));
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_post_drops_the_session() {
        let surface = Arc::new(FakeSurface::default());
        let registry = Registry::new();
        let giveaway = Giveaway::new(UserId::new(1), "Car", None, 1, 0).unwrap();
        let session = Session::new(UserId::new(1), 60, Instant::now(), giveaway);
        let id = session.id();

        surface.set_failing(true);
        assert!(launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .is_err());
        surface.set_failing(false);
        assert_eq!(registry.len().await, 0);

        advance(5).await;
        advance(60).await;

        assert!(surface.calls().is_empty());
        assert_eq!(
            participate(&registry, id, actor(5), GiveawayAction::Enter, &*surface).await,
            Err(Error::UnknownSession)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn giveaway_without_entrants_announces_nothing() {
        let surface = Arc::new(FakeSurface::default());
        let registry = Registry::new();
        let giveaway = Giveaway::new(UserId::new(1), "Car", None, 3, 0).unwrap();
        let session = Session::new(UserId::new(1), 60, Instant::now(), giveaway);

        launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .unwrap();
        settle().await;
        advance(60).await;

        assert!(surface.replies().is_empty());
        let frame = surface.edits().last().cloned().unwrap();
        assert!(frame
            .description
            .unwrap()
            .contains("No one entered the giveaway."));
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_survives_failed_edits() {
        let surface = Arc::new(FakeSurface::default());
        let registry = Registry::new();
        let giveaway = Giveaway::new(UserId::new(1), "Car", None, 1, 0).unwrap();
        let session = Session::new(UserId::new(1), 120, Instant::now(), giveaway);
        let id = session.id();

        launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .unwrap();
        settle().await;

        surface.set_failing(true);
        advance(30).await;
        assert!(registry.get(id).await.is_some());

        surface.set_failing(false);
        advance(90).await;
        assert!(registry.get(id).await.is_none());
        assert_eq!(surface.edits().last().unwrap().title, "Giveaway Ended");
    }

    #[tokio::test(start_paused = true)]
    async fn poll_end_to_end() {
        let surface = Arc::new(FakeSurface::default());
        let registry = Registry::new();
        let poll = Poll::new(
            "SiliconRP Poll",
            "Favourite?",
            "alice",
            vec![("Red".into(), None), ("Blue".into(), None)],
            0,
        )
        .unwrap();
        let session = Session::new(
            UserId::new(1),
            parse_duration("1m").unwrap(),
            Instant::now(),
            poll,
        );
        let id = session.id();

        launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .unwrap();
        settle().await;

        participate(&registry, id, actor(9), Vote(0), &*surface)
            .await
            .unwrap();
        participate(&registry, id, actor(9), Vote(1), &*surface)
            .await
            .unwrap();

        let handle = registry.get(id).await.unwrap();
        assert_eq!(handle.lock().await.engagement().tallies(), vec![0, 1]);
        let last_open = surface.edits().last().cloned().unwrap();

        advance(60).await;

        let session = handle.lock().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.engagement().tallies(), vec![0, 1]);
        drop(session);

        let last = surface.edits().last().cloned().unwrap();
        assert!(last.controls.is_empty());
        assert_eq!(last.fields, last_open.fields);
        assert!(last.fields[0].value.contains("**Red** — 0 votes"));
        assert!(last.fields[0].value.contains("**Blue** — 1 votes"));

        assert_eq!(
            handle
                .lock()
                .await
                .participate(actor(3), Vote(0), Instant::now())
                .err(),
            Some(Error::SessionClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poll_refreshes_every_second() {
        let surface = Arc::new(FakeSurface::default());
        let registry = Registry::new();
        let poll = Poll::new(
            "P",
            "Q",
            "a",
            vec![("A".into(), None), ("B".into(), None)],
            0,
        )
        .unwrap();
        let session = Session::new(UserId::new(1), 60, Instant::now(), poll);

        launch(&registry, session, CHANNEL, Arc::clone(&surface))
            .await
            .unwrap();
        settle().await;
        let before = surface.edits().len();

        for _ in 0..3 {
            advance(1).await;
        }

        assert_eq!(surface.edits().len(), before + 3);
        assert_eq!(
            surface.edits().last().unwrap().footer.as_deref(),
            Some("Time left: 57s\nPoll created by a")
        );
    }
}
