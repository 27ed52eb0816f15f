use crate::{
    context::Context,
    event::*,
    helper::{permissions_of, CommandOptions, InteractionHelper},
    log_error, log_internal,
    logging::{AsyncPrintColor, PrintColor},
    plugin::Plugin,
};
use anyhow::Result;
use serenity::all::{
    ChannelId, CommandOptionType, CreateCommand, CreateCommandOption, GetMessages, Message,
    MessageId, Permissions, Timestamp, UserId,
};
use std::num::NonZeroU64;

/// Discord caps both history pages and bulk deletes at 100 messages
const BATCH: usize = 100;
/// Bulk deletion refuses messages older than this
const BULK_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

pub struct Purge;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Target {
    All,
    Author(UserId),
    After(MessageId),
    Latest(usize),
}

/// Deletions grouped into the requests that perform them
#[derive(Debug, Default, PartialEq)]
struct Plan {
    bulk: Vec<Vec<MessageId>>,
    single: Vec<MessageId>,
}

impl Plan {
    /// `messages` are `(id, unix timestamp)` pairs
    fn new(messages: &[(MessageId, i64)], now: i64) -> Self {
        let (recent, old): (Vec<&(MessageId, i64)>, Vec<&(MessageId, i64)>) = messages
            .iter()
            .partition(|(_, timestamp)| now - timestamp < BULK_MAX_AGE_SECS);

        let mut plan = Plan {
            bulk: Vec::new(),
            single: old.into_iter().map(|(id, _)| *id).collect(),
        };

        let recent: Vec<MessageId> = recent.into_iter().map(|(id, _)| *id).collect();
        for chunk in recent.chunks(BATCH) {
            match chunk {
                // Bulk deletion takes at least two
                [id] => plan.single.push(*id),
                _ => plan.bulk.push(chunk.to_vec()),
            }
        }

        plan
    }
}

impl Target {
    /// Whether a message, met newest first, is deleted.  None stops the scan.
    fn select(&self, message: &Message, selected: usize) -> Option<bool> {
        match self {
            Target::All => Some(true),
            Target::Author(user) => Some(message.author.id == *user),
            Target::After(after) => (message.id > *after).then_some(true),
            Target::Latest(count) => (selected < *count).then_some(true),
        }
    }

    fn report(&self, deleted: usize) -> String {
        match self {
            Target::All => format!("Deleted **{}** messages (all in channel).", deleted),
            Target::Author(user) => format!("Deleted **{}** messages from <@{}>.", deleted, user),
            Target::After(after) => format!(
                "Deleted **{}** messages after message ID `{}`.",
                deleted, after
            ),
            Target::Latest(_) => format!("Deleted **{}** messages.", deleted),
        }
    }
}

#[serenity::async_trait]
impl Plugin for Purge {
    fn name(&self) -> &'static str {
        "purge"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some("/purge [user] [after] [amount] [all] - delete messages in this channel".to_owned())
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new("purge")
            .description("Delete messages in the channel with different filters.")
            .default_member_permissions(Permissions::MANAGE_MESSAGES)
            .add_option(CreateCommandOption::new(
                CommandOptionType::User,
                "user",
                "Delete all messages from this user",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "after",
                "Delete all messages after this message ID",
            ))
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "amount",
                    "Delete a specific number of messages",
                )
                .min_int_value(1),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::Boolean,
                "all",
                "Delete all messages in the channel (⚠️)",
            ))]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_command("purge") else {
            return Ok(EventHandled::No);
        };

        if !permissions_of(command.member.as_deref()).manage_messages() {
            command
                .say_private(ctx, "You don't have permission to manage messages.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        command.defer_private(ctx).await?;
        let channel_id = command.channel_id;

        let target = if command.bool_option("all").unwrap_or(false) {
            Target::All
        } else if let Some(user) = command.user_option("user") {
            Target::Author(user)
        } else if let Some(after) = command.str_option("after") {
            let after = after.trim().parse::<NonZeroU64>().ok().map(MessageId::from);
            let exists = match after {
                Some(after) => channel_id.message(ctx.cache_http, after).await.is_ok(),
                None => false,
            };
            match after {
                Some(after) if exists => Target::After(after),
                _ => {
                    command.follow_up_private(ctx, "Invalid message ID.").await?;
                    return Ok(EventHandled::Yes);
                }
            }
        } else if let Some(amount) = command.int_option("amount").filter(|n| *n > 0) {
            Target::Latest(usize::try_from(amount).unwrap_or(usize::MAX))
        } else {
            command
                .follow_up_private(
                    ctx,
                    "You must specify at least one option (user, after, amount, or all).",
                )
                .await?;
            return Ok(EventHandled::Yes);
        };

        let messages = scan(ctx, channel_id, target).await?;
        let plan = Plan::new(&messages, Timestamp::now().unix_timestamp());
        let deleted = execute(ctx, channel_id, plan).await;

        log_internal!(
            "Purged {} messages in {} for {}",
            deleted,
            channel_id.color(ctx.http).await,
            command.user.color()
        );
        command
            .follow_up_private(ctx, &target.report(deleted))
            .await?;
        Ok(EventHandled::Yes)
    }
}

/// Walk the history newest first, collecting `(id, timestamp)` of the targeted messages
async fn scan(ctx: &Context<'_>, channel_id: ChannelId, target: Target) -> Result<Vec<(MessageId, i64)>> {
    let mut selected = Vec::new();
    let mut before: Option<MessageId> = None;

    loop {
        let mut request = GetMessages::new().limit(BATCH as u8);
        if let Some(before) = before {
            request = request.before(before);
        }
        let page = channel_id.messages(ctx.http, request).await?;
        let exhausted = page.len() < BATCH;
        before = page.last().map(|message| message.id);

        for message in &page {
            match target.select(message, selected.len()) {
                Some(true) => selected.push((message.id, message.timestamp.unix_timestamp())),
                Some(false) => {}
                None => return Ok(selected),
            }
        }

        if exhausted {
            return Ok(selected);
        }
    }
}

/// Returns how many messages were deleted.  Failures are logged and skipped.
async fn execute(ctx: &Context<'_>, channel_id: ChannelId, plan: Plan) -> usize {
    let mut deleted = 0;

    for chunk in plan.bulk {
        match channel_id.delete_messages(ctx.http, &chunk).await {
            Ok(()) => deleted += chunk.len(),
            Err(e) => log_error!("Could not bulk delete {} messages: {}", chunk.len(), e),
        }
    }
    for id in plan.single {
        match channel_id.delete_message(ctx.http, id).await {
            Ok(()) => deleted += 1,
            Err(e) => log_error!("Could not delete message {}: {}", id, e),
        }
    }

    deleted
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;
    const DAY: i64 = 24 * 60 * 60;

    fn ids(range: std::ops::RangeInclusive<u64>, age: i64) -> Vec<(MessageId, i64)> {
        range.map(|id| (MessageId::new(id), NOW - age)).collect()
    }

    #[test]
    fn recent_messages_are_bulk_deleted_in_hundreds() {
        let plan = Plan::new(&ids(1..=250, DAY), NOW);

        let sizes: Vec<usize> = plan.bulk.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert!(plan.single.is_empty());
    }

    #[test]
    fn lone_leftover_is_deleted_singly() {
        let plan = Plan::new(&ids(1..=101, DAY), NOW);

        assert_eq!(plan.bulk.len(), 1);
        assert_eq!(plan.single, vec![MessageId::new(101)]);
    }

    #[test]
    fn old_messages_are_deleted_singly() {
        let mut messages = ids(1..=3, DAY);
        messages.extend(ids(4..=5, 15 * DAY));

        let plan = Plan::new(&messages, NOW);

        assert_eq!(
            plan.bulk,
            vec![vec![MessageId::new(1), MessageId::new(2), MessageId::new(3)]]
        );
        assert_eq!(plan.single, vec![MessageId::new(4), MessageId::new(5)]);
    }

    #[test]
    fn nothing_to_delete() {
        assert_eq!(Plan::new(&[], NOW), Plan::default());
    }

    #[test]
    fn reports() {
        assert_eq!(
            Target::All.report(12),
            "Deleted **12** messages (all in channel)."
        );
        assert_eq!(
            Target::Author(UserId::new(5)).report(3),
            "Deleted **3** messages from <@5>."
        );
        assert_eq!(
            Target::After(MessageId::new(99)).report(0),
            "Deleted **0** messages after message ID `99`."
        );
        assert_eq!(Target::Latest(10).report(10), "Deleted **10** messages.");
    }
}
