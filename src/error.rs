//! Failures which are the actor's to fix.  The `Display` text is what the actor is told,
//! privately.  Plumbing failures stay `anyhow::Error`.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(
        "Invalid duration format! Use `m` for minutes, `h` for hours, or `d` for days. \
         Example: `10m`, `2h`, `1d`."
    )]
    InvalidDuration,

    #[error("{0}")]
    InvalidInput(String),

    #[error("A poll needs between 2 and 5 options, but {0} were given.")]
    InvalidOptionCount(usize),

    #[error("Bots cannot take part in giveaways!")]
    ActorIneligible,

    #[error("You are already entered!")]
    AlreadyEntered,

    #[error("You are not in the giveaway!")]
    NotEntered,

    #[error("{0}")]
    NotPermitted(String),

    #[error("This has already ended.")]
    SessionClosed,

    #[error("This is no longer active.")]
    UnknownSession,

    #[error("Configuration problem: {0}")]
    ConfigurationMissing(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
