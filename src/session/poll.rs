use super::{sanitize_link, Actor, Engagement, Resolution, SessionId};
use crate::{
    duration::format_countdown,
    error::{Error, Result},
    surface::{ControlStyle, Frame},
};
use rand::RngCore;
use serenity::all::UserId;
use std::time::Duration;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;
const BAR_CELLS: usize = 10;
const REFRESH: Duration = Duration::from_secs(1);

/// Single-choice vote over 2 to 5 options
pub struct Poll {
    title: String,
    question: String,
    author_name: String,
    options: Vec<PollOption>,
    color: u32,
}

pub struct PollOption {
    pub label: String,
    pub link: Option<String>,
    /// Each voter is in at most one option's list
    voters: Vec<UserId>,
}

/// Vote for the option at this index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vote(pub usize);

impl Vote {
    pub fn custom_id(&self, id: SessionId) -> String {
        format!("poll:vote:{}:{}", id, self.0)
    }
}

impl Poll {
    /// Options arrive in slot order; blank slots are skipped.  Invalid links are dropped.
    pub fn new(
        title: impl Into<String>,
        question: impl Into<String>,
        author_name: impl Into<String>,
        options: Vec<(String, Option<String>)>,
        color: u32,
    ) -> Result<Self> {
        let options: Vec<PollOption> = options
            .into_iter()
            .filter(|(label, _)| !label.trim().is_empty())
            .map(|(label, link)| PollOption {
                label,
                link: sanitize_link(link),
                voters: Vec::new(),
            })
            .collect();

        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(Error::InvalidOptionCount(options.len()));
        }

        Ok(Self {
            title: title.into(),
            question: question.into(),
            author_name: author_name.into(),
            options,
            color,
        })
    }

    #[cfg(test)]
    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    #[cfg(test)]
    pub fn tallies(&self) -> Vec<usize> {
        self.options.iter().map(|o| o.voters.len()).collect()
    }

    pub fn total_votes(&self) -> usize {
        self.options.iter().map(|o| o.voters.len()).sum()
    }

    /// Share of the vote per option, in percent.  All zero before the first vote.
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total_votes();
        self.options
            .iter()
            .map(|o| {
                if total == 0 {
                    0.0
                } else {
                    o.voters.len() as f64 / total as f64 * 100.0
                }
            })
            .collect()
    }

    fn results(&self) -> String {
        if self.total_votes() == 0 {
            return "No votes yet.".to_owned();
        }

        self.options
            .iter()
            .zip(self.percentages())
            .map(|(option, percent)| {
                format!(
                    "**{}** — {} votes ({:.1}%)\n`{}`\n",
                    option.label,
                    option.voters.len(),
                    percent,
                    bar(percent),
                )
            })
            .collect()
    }

    fn links(&self) -> Option<String> {
        let links: Vec<String> = self
            .options
            .iter()
            .filter_map(|o| o.link.as_ref().map(|link| format!("[{}]({})", o.label, link)))
            .collect();

        (!links.is_empty()).then(|| links.join("\n"))
    }

    fn frame(&self, timer: String) -> Frame {
        let mut frame = Frame::new(&self.title, self.color)
            .description(&self.question)
            .footer(format!("{}\nPoll created by {}", timer, self.author_name))
            .field("Results", self.results(), false);

        if let Some(links) = self.links() {
            frame = frame.field("Links", links, false);
        }

        frame
    }
}

/// Ten cells, one per full 10%, padded to a fixed width
fn bar(percent: f64) -> String {
    let filled = ((percent / 10.0).floor() as usize).min(BAR_CELLS);
    format!("{:<width$}", "█".repeat(filled), width = BAR_CELLS)
}

impl Engagement for Poll {
    type Action = Vote;
    type Ack = ();

    fn render(&self, id: SessionId, remaining: u64) -> Frame {
        let mut frame = self.frame(format!("Time left: {}", format_countdown(remaining)));
        for (index, option) in self.options.iter().enumerate() {
            frame = frame.control(Vote(index).custom_id(id), &option.label, ControlStyle::Primary);
        }
        frame
    }

    fn apply(&mut self, actor: Actor, Vote(choice): Vote) -> Result<()> {
        if choice >= self.options.len() {
            return Err(Error::InvalidInput("That option does not exist.".to_owned()));
        }

        for option in &mut self.options {
            option.voters.retain(|voter| *voter != actor.id);
        }
        self.options[choice].voters.push(actor.id);

        Ok(())
    }

    fn refresh_delay(&self, _remaining: u64) -> Duration {
        REFRESH
    }

    /// Final tallies, controls removed
    fn resolve(&mut self, _rng: &mut dyn RngCore) -> Resolution {
        Resolution {
            frame: self.frame("Poll ended".to_owned()),
            announcement: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn options(labels: &[&str]) -> Vec<(String, Option<String>)> {
        labels.iter().map(|l| (l.to_string(), None)).collect()
    }

    fn poll(labels: &[&str]) -> Poll {
        Poll::new("SiliconRP Poll", "Best colour?", "alice", options(labels), 0).unwrap()
    }

    #[test]
    fn option_count_bounds() {
        assert_eq!(
            Poll::new("t", "q", "a", options(&["Only"]), 0).err(),
            Some(Error::InvalidOptionCount(1))
        );
        assert_eq!(
            Poll::new("t", "q", "a", options(&["1", "2", "3", "4", "5", "6"]), 0).err(),
            Some(Error::InvalidOptionCount(6))
        );
        assert_eq!(
            Poll::new("t", "q", "a", options(&["Red", "", "  "]), 0).err(),
            Some(Error::InvalidOptionCount(1))
        );
        assert!(Poll::new("t", "q", "a", options(&["1", "2", "3", "4", "5"]), 0).is_ok());
    }

    #[test]
    fn invalid_links_are_dropped_silently() {
        let p = Poll::new(
            "t",
            "q",
            "a",
            vec![
                ("Red".into(), Some("https://red.example".into())),
                ("Blue".into(), Some("blue dot com".into())),
            ],
            0,
        )
        .unwrap();

        assert_eq!(p.options()[0].link.as_deref(), Some("https://red.example"));
        assert_eq!(p.options()[1].link, None);
        assert_eq!(p.links().unwrap(), "[Red](https://red.example)");
    }

    #[test]
    fn revoting_moves_the_vote() {
        let mut p = poll(&["Red", "Blue"]);

        p.apply(actor(1), Vote(0)).unwrap();
        assert_eq!(p.tallies(), vec![1, 0]);

        p.apply(actor(1), Vote(1)).unwrap();
        assert_eq!(p.tallies(), vec![0, 1]);

        p.apply(actor(1), Vote(1)).unwrap();
        assert_eq!(p.tallies(), vec![0, 1]);
    }

    #[test]
    fn total_never_exceeds_distinct_voters() {
        let mut p = poll(&["A", "B", "C"]);
        let choices = [(1, 0), (2, 1), (1, 2), (3, 2), (2, 0), (1, 1), (3, 0)];

        for (voter, choice) in choices {
            p.apply(actor(voter), Vote(choice)).unwrap();
            assert!(p.total_votes() <= 3);
        }
        assert_eq!(p.total_votes(), 3);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut p = poll(&["Red", "Blue"]);
        assert!(matches!(p.apply(actor(1), Vote(2)), Err(Error::InvalidInput(_))));
        assert_eq!(p.total_votes(), 0);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let mut p = poll(&["A", "B", "C"]);
        assert_eq!(p.percentages(), vec![0.0, 0.0, 0.0]);

        p.apply(actor(1), Vote(0)).unwrap();
        p.apply(actor(2), Vote(1)).unwrap();
        p.apply(actor(3), Vote(1)).unwrap();

        let sum: f64 = p.percentages().iter().sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn bars_have_fixed_width() {
        assert_eq!(bar(0.0), " ".repeat(10));
        assert_eq!(bar(33.3), format!("███{}", " ".repeat(7)));
        assert_eq!(bar(100.0), "█".repeat(10));
        assert_eq!(bar(100.0).chars().count(), 10);
        assert_eq!(bar(66.7).chars().count(), 10);
    }

    #[test]
    fn render_lists_tallies_and_buttons() {
        let mut p = poll(&["Red", "Blue"]);
        p.apply(actor(1), Vote(1)).unwrap();

        let id: SessionId = "4".parse().unwrap();
        let frame = p.render(id, 59);

        assert_eq!(frame.title, "SiliconRP Poll");
        assert_eq!(frame.description.as_deref(), Some("Best colour?"));
        assert_eq!(
            frame.footer.as_deref(),
            Some("Time left: 59s\nPoll created by alice")
        );
        assert!(frame.fields[0].value.contains("**Red** — 0 votes (0.0%)"));
        assert!(frame.fields[0].value.contains("**Blue** — 1 votes (100.0%)"));
        assert_eq!(frame.controls.len(), 2);
        assert_eq!(frame.controls[1].custom_id, "poll:vote:4:1");
    }

    #[test]
    fn no_votes_placeholder() {
        let p = poll(&["Red", "Blue"]);
        let frame = p.render("1".parse().unwrap(), 10);
        assert_eq!(frame.fields[0].value, "No votes yet.");
    }

    #[test]
    fn resolution_freezes_tallies_without_controls() {
        let mut p = poll(&["Red", "Blue"]);
        p.apply(actor(1), Vote(0)).unwrap();
        let open = p.render("1".parse().unwrap(), 1);

        let resolution = p.resolve(&mut StdRng::seed_from_u64(0));

        assert!(resolution.frame.controls.is_empty());
        assert_eq!(resolution.frame.fields, open.fields);
        assert_eq!(
            resolution.frame.footer.as_deref(),
            Some("Poll ended\nPoll created by alice")
        );
    }
}
