//! Timed interactive sessions: giveaways and polls.
//!
//! A [`Session`] wraps a variant-specific [`Engagement`] with everything the variants share: the
//! creator, an expiry instant, the message the session renders into, and the OPEN → CLOSED state.
//! The engine in [`engine`] drives sessions from the outside: it posts the initial frame, feeds
//! participation events in, and runs one refresh task per session until terminal resolution.
//!
//! Everything here is synchronous.  A mutation and the frame rendered from it come out of one
//! method call; the engine keeps the session locked until that frame has been pushed.

pub mod engine;
pub mod giveaway;
pub mod poll;
pub mod registry;

use crate::{error::Result, error::Error, surface::Frame, surface::MessageRef};
use rand::RngCore;
use regex::Regex;
use serenity::all::UserId;
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        LazyLock,
    },
    time::Duration,
};
use tokio::time::Instant;

pub use engine::{launch, participate};
pub use registry::Registry;

/// Delay before checking again whether the initial frame has been posted
const UNBOUND_RETRY: Duration = Duration::from_secs(5);
/// Unbound checks before a session is given up on
const MAX_UNBOUND_RETRIES: u32 = 12;

/// Process-unique session identity, embedded in component custom ids
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Whoever triggered a participation event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub bot: bool,
}

/// Final display of a closed session, plus an optional public follow-up
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub frame: Frame,
    pub announcement: Option<String>,
}

/// The variant-specific half of a session
pub trait Engagement: Send + 'static {
    type Action: Send;
    type Ack: Send;

    /// Display while OPEN, with `remaining` whole seconds on the clock
    fn render(&self, id: SessionId, remaining: u64) -> Frame;
    /// Mutate participation data.  A failed action leaves the data untouched.
    fn apply(&mut self, actor: Actor, action: Self::Action) -> Result<Self::Ack>;
    /// How long to wait before the next refresh
    fn refresh_delay(&self, remaining: u64) -> Duration;
    /// Called exactly once, when the session closes on expiry
    fn resolve(&mut self, rng: &mut dyn RngCore) -> Resolution;
}

/// What the refresh task should do next
#[derive(Debug)]
pub enum Tick {
    /// No message bound yet; check again later
    Unbound { retry_in: Duration },
    /// Never bound; the session has been closed without display
    Abandoned,
    Refresh {
        target: MessageRef,
        frame: Frame,
        next_in: Duration,
    },
    Resolved {
        target: MessageRef,
        resolution: Resolution,
    },
    /// Closed by someone else, e.g. shutdown
    Closed,
}

pub struct Session<E> {
    id: SessionId,
    creator: UserId,
    expiry: Instant,
    bound: Option<MessageRef>,
    state: SessionState,
    unbound_ticks: u32,
    engagement: E,
}

impl<E: Engagement> Session<E> {
    pub fn new(creator: UserId, duration_secs: u64, now: Instant, engagement: E) -> Self {
        Self {
            id: SessionId::next(),
            creator,
            expiry: now + Duration::from_secs(duration_secs),
            bound: None,
            state: SessionState::Open,
            unbound_ticks: 0,
            engagement,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn creator(&self) -> UserId {
        self.creator
    }

    #[cfg(test)]
    pub fn bound(&self) -> Option<MessageRef> {
        self.bound
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub fn engagement(&self) -> &E {
        &self.engagement
    }

    /// Whole seconds until expiry, zero once expired
    pub fn remaining(&self, now: Instant) -> u64 {
        self.expiry.saturating_duration_since(now).as_secs()
    }

    /// Bind the session to its posted message.  The first binding sticks; returns whether
    /// `target` is the bound message afterwards.
    pub fn bind(&mut self, target: MessageRef) -> bool {
        *self.bound.get_or_insert(target) == target
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn render(&self, now: Instant) -> Frame {
        self.engagement.render(self.id, self.remaining(now))
    }

    /// Apply a participation event.  On success, also returns the re-rendered frame and where
    /// it goes, if the session is bound yet.
    pub fn participate(
        &mut self,
        actor: Actor,
        action: E::Action,
        now: Instant,
    ) -> Result<(E::Ack, Option<(MessageRef, Frame)>)> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }

        let ack = self.engagement.apply(actor, action)?;
        let update = self.bound.map(|target| (target, self.render(now)));
        Ok((ack, update))
    }

    /// One step of the refresh activity.  Resolution happens here, inside the same call that
    /// flips the state, so it cannot run twice.
    pub fn tick(&mut self, now: Instant, rng: &mut dyn RngCore) -> Tick {
        if self.state == SessionState::Closed {
            return Tick::Closed;
        }

        let Some(target) = self.bound else {
            self.unbound_ticks += 1;
            if self.unbound_ticks > MAX_UNBOUND_RETRIES {
                self.close();
                return Tick::Abandoned;
            }
            return Tick::Unbound {
                retry_in: UNBOUND_RETRY,
            };
        };

        // Whole seconds round down, so compare instants
        if now >= self.expiry {
            self.close();
            return Tick::Resolved {
                target,
                resolution: self.engagement.resolve(rng),
            };
        }

        let remaining = self.remaining(now);
        // Never sleep past expiry
        let next_in = self
            .engagement
            .refresh_delay(remaining)
            .min(self.expiry.saturating_duration_since(now));

        Tick::Refresh {
            target,
            frame: self.engagement.render(self.id, remaining),
            next_in,
        }
    }
}

/// Strict `http(s)://` link with no whitespace
pub fn is_link(text: &str) -> bool {
    static LINK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^https?://[^\s]+$").expect("valid link pattern"));
    LINK.is_match(text)
}

/// Keep `link` only if it is a valid link
pub fn sanitize_link(link: Option<String>) -> Option<String> {
    link.filter(|link| is_link(link))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serenity::all::{ChannelId, MessageId};

    pub fn actor(id: u64) -> Actor {
        Actor {
            id: UserId::new(id),
            bot: false,
        }
    }

    pub fn target() -> MessageRef {
        MessageRef {
            channel_id: ChannelId::new(10),
            message_id: MessageId::new(20),
        }
    }
}
