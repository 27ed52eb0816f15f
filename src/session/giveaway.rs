use super::{sanitize_link, Actor, Engagement, Resolution, SessionId};
use crate::{
    duration::format_countdown,
    error::{Error, Result},
    surface::{ControlStyle, Frame},
};
use rand::{seq::SliceRandom, RngCore};
use serenity::all::UserId;
use std::{collections::HashSet, time::Duration};

const COLOR_ENDED_EMPTY: u32 = 0xE74C3C;
const COLOR_ENDED_WON: u32 = 0x2ECC71;

/// A prize draw among everyone who pressed "Enter"
pub struct Giveaway {
    host: UserId,
    prize: String,
    prize_link: Option<String>,
    winners: u32,
    entrants: HashSet<UserId>,
    color: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GiveawayAction {
    Enter,
    Leave,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GiveawayAck {
    Entered,
    Left,
}

impl GiveawayAck {
    pub fn message(&self) -> &'static str {
        match self {
            GiveawayAck::Entered => "You have entered the giveaway!",
            GiveawayAck::Left => "You have left the giveaway.",
        }
    }
}

impl GiveawayAction {
    pub fn custom_id(&self, id: SessionId) -> String {
        match self {
            GiveawayAction::Enter => format!("giveaway:enter:{}", id),
            GiveawayAction::Leave => format!("giveaway:leave:{}", id),
        }
    }
}

impl Giveaway {
    pub fn new(
        host: UserId,
        prize: impl Into<String>,
        prize_link: Option<String>,
        winners: i64,
        color: u32,
    ) -> Result<Self> {
        let winners = u32::try_from(winners)
            .ok()
            .filter(|winners| *winners >= 1)
            .ok_or(Error::InvalidInput(
                "There must be at least **1 winner**.".to_owned(),
            ))?;

        Ok(Self {
            host,
            prize: prize.into(),
            prize_link: sanitize_link(prize_link),
            winners,
            entrants: HashSet::new(),
            color,
        })
    }

    #[cfg(test)]
    pub fn entrants(&self) -> &HashSet<UserId> {
        &self.entrants
    }

    fn prize_text(&self) -> String {
        match &self.prize_link {
            Some(link) => format!("[{}]({})", self.prize, link),
            None => self.prize.clone(),
        }
    }

    /// Up to `winners` distinct entrants, uniformly at random
    pub fn draw(&self, rng: &mut dyn RngCore) -> Vec<UserId> {
        // Sort first so a seeded draw is reproducible regardless of hash order
        let mut pool: Vec<UserId> = self.entrants.iter().copied().collect();
        pool.sort();
        pool.choose_multiple(rng, self.winners as usize)
            .copied()
            .collect()
    }
}

impl Engagement for Giveaway {
    type Action = GiveawayAction;
    type Ack = GiveawayAck;

    fn render(&self, id: SessionId, remaining: u64) -> Frame {
        Frame::new("🎉 New Giveaway Alert! 🥳", self.color)
            .description(format!(
                "**Prize:** {}\n\
                 **Hosted by:** <@{}>\n\
                 **Time remaining:** {}\n\
                 **Number of winners:** {}\n\n\
                 **Entries so far:** {}",
                self.prize_text(),
                self.host,
                format_countdown(remaining),
                self.winners,
                self.entrants.len(),
            ))
            .footer("The giveaway has not ended yet.")
            .control(
                GiveawayAction::Enter.custom_id(id),
                "Enter Giveaway",
                ControlStyle::Success,
            )
            .control(
                GiveawayAction::Leave.custom_id(id),
                "Leave Giveaway",
                ControlStyle::Danger,
            )
    }

    fn apply(&mut self, actor: Actor, action: GiveawayAction) -> Result<GiveawayAck> {
        if actor.bot {
            return Err(Error::ActorIneligible);
        }

        match action {
            GiveawayAction::Enter if self.entrants.insert(actor.id) => Ok(GiveawayAck::Entered),
            GiveawayAction::Enter => Err(Error::AlreadyEntered),
            GiveawayAction::Leave if self.entrants.remove(&actor.id) => Ok(GiveawayAck::Left),
            GiveawayAction::Leave => Err(Error::NotEntered),
        }
    }

    /// Distant expiries refresh rarely, imminent ones often
    fn refresh_delay(&self, remaining: u64) -> Duration {
        let secs = match remaining {
            r if r > 86_400 => 900,
            r if r > 3600 => 300,
            r if r > 600 => 60,
            r if r > 60 => 15,
            _ => 5,
        };
        Duration::from_secs(secs)
    }

    fn resolve(&mut self, rng: &mut dyn RngCore) -> Resolution {
        let prize_text = self.prize_text();

        if self.entrants.is_empty() {
            return Resolution {
                frame: Frame::new("Giveaway Ended", COLOR_ENDED_EMPTY).description(format!(
                    "**Prize:** {}\n\
                     **Hosted by:** <@{}>\n\n\
                     **No one entered the giveaway.**",
                    prize_text, self.host,
                )),
                announcement: None,
            };
        }

        let mentions = self
            .draw(rng)
            .iter()
            .map(|id| format!("<@{}>", id))
            .collect::<Vec<_>>()
            .join(", ");

        Resolution {
            frame: Frame::new("Giveaway Ended", COLOR_ENDED_WON).description(format!(
                "**Prize:** {}\n\
                 **Hosted by:** <@{}>\n\
                 **Winners:** {}\n\n\
                 Congratulations!",
                prize_text, self.host, mentions,
            )),
            announcement: Some(format!(
                "Congratulations {}! You won **{}**!",
                mentions, prize_text
            )),
        }
    }
}
