//! Timer cog: create, list, edit, and delete personal reminders.
//!
//! `;timer in 8min45sec to do that thing` schedules a one-shot reminder; `every <time>` makes
//! it repeat.  Records persist in `PersistentState` and are delivered by the firing loop in
//! [`fire`].

pub mod duration;
pub mod fire;
pub mod store;

use crate::{event::*, plugin::*};
use anyhow::Result;
use serenity::all::{CreateEmbed, CreateEmbedAuthor, CreateMessage, Message};
use std::time::Duration;
use store::SortKey;
use tokio::sync::oneshot;

/// Everything that can go wrong with a timer request.  All variants are reported back to the
/// requester as a message; none are fatal.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// Malformed or out-of-bounds user input
    #[error("{0}")]
    Invalid(String),
    /// Per-user timer cap reached
    #[error("You have too many timers! I can only keep track of {0} timers for you at a time.")]
    LimitExceeded(usize),
    /// No timer with that ID for this user
    #[error("Timer with ID# **{0}** does not exist! Check the timer list and verify you typed the correct ID#.")]
    NotFound(u32),
}

/// Words that cancel repeating via `;timer modify repeat <id> <word>`
const REPEAT_CANCEL_WORDS: &[&str] = &["0", "stop", "none", "false", "no", "cancel", "n"];

pub fn epoch_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct PluginTimer;

#[serenity::async_trait]
impl Plugin for PluginTimer {
    fn name(&self) -> &'static str {
        "timer"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!(
            "{p}timer [in] <time> [to] [text] - create a timer, e.g. `{p}timer in 8min45sec to do that thing`\n\
             |  <time> supports commas, spaces, and \"and\": `12h30m`, `6 hours and 15 minutes`\n\
             |  add `every <time>` for a repeating timer (hours/minutes only)\n\
             {p}timer list [time|added|id] - show your timers\n\
             {p}timer modify time <id> <time> - change when a timer fires\n\
             {p}timer modify repeat <id> <time|stop> - change or cancel repeating\n\
             {p}timer modify text <id> <text> - change a timer's text\n\
             {p}timer remove <id|last|all> - delete timers",
            p = prefix
        ))
    }

    async fn handle(&self, ctx: &Context, event: &crate::event::Event) -> Result<EventHandled> {
        // A parked `remove all` confirmation gets first claim on yes/no replies.
        if let Event::Message(msg) = event {
            if try_answer_confirmation(ctx, msg).await {
                return Ok(EventHandled::Yes);
            }
        }

        let Some((msg, rest)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let (first, remainder) = take_word(rest);
        match first {
            "" => {
                let prefix = &ctx.cfg.read().await.general.command_prefix;
                msg.reply(
                    ctx.cache_http,
                    format!("Tell me when to remind you, e.g. `{}timer in 2 hours to stretch`. See `{}help` for all the options.", prefix, prefix),
                )
                .await?;
            }
            "list" | "ls" => list(ctx, msg, remainder).await?,
            "modify" | "edit" => modify(ctx, msg, remainder).await?,
            "remove" | "delete" | "del" => remove(ctx, msg, remainder).await?,
            _ => create(ctx, msg, rest).await?,
        }

        Ok(EventHandled::Yes)
    }
}

/// Split off the first whitespace-delimited word, returning it and the trimmed remainder.
fn take_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Validates a creation request.  The per-user cap is checked before the text is parsed, so
/// a user at the cap always hears about the cap, whatever they typed.
fn parse_create_request(
    timers: &store::Timers,
    user_id: serenity::all::UserId,
    raw: &str,
    max_user_timers: usize,
) -> Result<duration::ParsedTimer, TimerError> {
    timers.check_capacity(user_id, max_user_timers)?;
    duration::parse_timer_text(raw)
}

async fn create(ctx: &Context<'_>, msg: &Message, raw: &str) -> Result<()> {
    let max_user_timers = ctx.cfg.read().await.timer.max_user_timers;

    let parsed = {
        let pstate = ctx.pstate.read().await;
        parse_create_request(&pstate.timers, msg.author.id, raw, max_user_timers)
    };
    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            msg.reply(ctx.cache_http, e.to_string()).await?;
            return Ok(());
        }
    };

    let Some(one_shot) = parsed.duration else {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        msg.reply(
            ctx.cache_http,
            format!(
                "I could not find a time in there. Try `{}timer in 8min45sec to do that thing`.",
                prefix
            ),
        )
        .await?;
        return Ok(());
    };

    let now = epoch_now();

    let mut pstate = ctx.pstate.write().await;
    let record = match pstate.timers.create(
        msg.author.id,
        msg.channel_id,
        one_shot,
        parsed.repeat,
        &parsed.label,
        now,
        max_user_timers,
    ) {
        Ok(record) => record,
        Err(e) => {
            drop(pstate);
            msg.reply(ctx.cache_http, e.to_string()).await?;
            return Ok(());
        }
    };
    pstate.save().await?;
    drop(pstate);

    let mut reply = String::from("Timer is set! I will ping you ");
    match parsed.repeat {
        Some(repeat) => reply.push_str(&format!("every {}", duration::humanize(repeat))),
        None => reply.push_str(&format!("in {}", record.due_in_text)),
    }
    if parsed.repeat.is_some() && parsed.repeat != Some(one_shot) {
        reply.push_str(&format!(", with the first timer in {}.", record.due_in_text));
    } else {
        reply.push('.');
    }
    msg.reply(ctx.cache_http, reply).await?;
    Ok(())
}

async fn list(ctx: &Context<'_>, msg: &Message, args: &str) -> Result<()> {
    let (sort_word, _) = take_word(args);
    let sort_word = if sort_word.is_empty() { "time" } else { sort_word };
    let sort = match sort_word.parse::<SortKey>() {
        Ok(sort) => sort,
        Err(e) => {
            msg.reply(ctx.cache_http, e.to_string()).await?;
            return Ok(());
        }
    };

    let records = ctx.pstate.read().await.timers.list(msg.author.id, sort);
    if records.is_empty() {
        msg.reply(ctx.cache_http, "You don't have any upcoming timers.")
            .await?;
        return Ok(());
    }

    let now = epoch_now();
    let mut embed = CreateEmbed::new().author(CreateEmbedAuthor::new(format!(
        "{}'s pending timers:",
        msg.author.name
    )));
    for record in &records {
        let title = format!(
            "[`{}`] {}",
            record.user_timer_id,
            if record.label.is_empty() {
                "(no text)"
            } else {
                record.label.as_str()
            }
        );
        let due_in = record.due_in(now);
        let mut body = if due_in > 1 {
            format!("In {}", duration::humanize(Duration::from_secs(due_in)))
        } else {
            "Now!".to_string()
        };
        if let Some(interval) = record.repeat_interval {
            body.push_str(&format!(
                "\nRepeating every `{}`",
                duration::humanize(Duration::from_secs(interval))
            ));
        }
        embed = embed.field(title, body, false);
    }

    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn modify(ctx: &Context<'_>, msg: &Message, args: &str) -> Result<()> {
    let (sub, rest) = take_word(args);
    let (id_word, raw) = take_word(rest);

    let Ok(timer_id) = id_word.parse::<u32>() else {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        msg.reply(
            ctx.cache_http,
            format!(
                "Usage: `{}timer modify <time|repeat|text> <id> ...`. See `{}help`.",
                prefix, prefix
            ),
        )
        .await?;
        return Ok(());
    };

    match sub {
        "time" => modify_time(ctx, msg, timer_id, raw).await,
        "repeat" => modify_repeat(ctx, msg, timer_id, raw).await,
        "text" => modify_text(ctx, msg, timer_id, raw).await,
        _ => {
            msg.reply(
                ctx.cache_http,
                "Valid modify subcommands are: `time`, `repeat`, or `text`.",
            )
            .await?;
            Ok(())
        }
    }
}

async fn modify_time(ctx: &Context<'_>, msg: &Message, timer_id: u32, raw: &str) -> Result<()> {
    let new_duration = match duration::parse_plain_duration(raw, false) {
        Ok(Some(duration)) => duration,
        Ok(None) => {
            msg.reply(ctx.cache_http, "That doesn't look like a time, e.g. `10 minutes`.")
                .await?;
            return Ok(());
        }
        Err(e) => {
            msg.reply(ctx.cache_http, e.to_string()).await?;
            return Ok(());
        }
    };

    let now = epoch_now();
    let mut pstate = ctx.pstate.write().await;
    let record = match pstate
        .timers
        .modify_time(msg.author.id, timer_id, new_duration, now)
    {
        Ok(record) => record,
        Err(e) => {
            drop(pstate);
            msg.reply(ctx.cache_http, e.to_string()).await?;
            return Ok(());
        }
    };
    pstate.save().await?;
    drop(pstate);

    let mut reply = format!(
        "Timer with ID# **{}** will now remind you in {}",
        timer_id, record.due_in_text
    );
    match record.repeat_interval {
        Some(interval) => reply.push_str(&format!(
            ", repeating every {} thereafter.",
            duration::humanize(Duration::from_secs(interval))
        )),
        None => reply.push('.'),
    }
    msg.reply(ctx.cache_http, reply).await?;
    Ok(())
}

async fn modify_repeat(ctx: &Context<'_>, msg: &Message, timer_id: u32, raw: &str) -> Result<()> {
    let cancel = REPEAT_CANCEL_WORDS
        .iter()
        .any(|w| raw.trim().eq_ignore_ascii_case(w));

    let new_repeat = if cancel {
        None
    } else {
        match duration::parse_plain_duration(raw, true) {
            Ok(Some(duration)) => Some(duration),
            Ok(None) => {
                msg.reply(
                    ctx.cache_http,
                    "That doesn't look like a repeat time, e.g. `30 minutes`, or `stop` to cancel repeating.",
                )
                .await?;
                return Ok(());
            }
            Err(e) => {
                msg.reply(ctx.cache_http, e.to_string()).await?;
                return Ok(());
            }
        }
    };

    let now = epoch_now();
    let mut pstate = ctx.pstate.write().await;
    let record = match pstate
        .timers
        .modify_repeat(msg.author.id, timer_id, new_repeat)
    {
        Ok(record) => record,
        Err(e) => {
            drop(pstate);
            msg.reply(ctx.cache_http, e.to_string()).await?;
            return Ok(());
        }
    };
    pstate.save().await?;
    drop(pstate);

    let due_in = duration::humanize(Duration::from_secs(record.due_in(now)));
    let reply = match new_repeat {
        Some(repeat) => format!(
            "Timer with ID# **{}** will now remind you every {}, with the first timer being sent in {}.",
            timer_id,
            duration::humanize(repeat),
            due_in
        ),
        None => format!(
            "Timer with ID# **{}** will not repeat anymore. The final timer will be sent in {}.",
            timer_id, due_in
        ),
    };
    msg.reply(ctx.cache_http, reply).await?;
    Ok(())
}

async fn modify_text(ctx: &Context<'_>, msg: &Message, timer_id: u32, raw: &str) -> Result<()> {
    let mut pstate = ctx.pstate.write().await;
    match pstate.timers.modify_text(msg.author.id, timer_id, raw.trim()) {
        Ok(_) => {
            pstate.save().await?;
            drop(pstate);
            msg.reply(
                ctx.cache_http,
                format!("Timer with ID# **{}** has been edited successfully.", timer_id),
            )
            .await?;
        }
        Err(e) => {
            drop(pstate);
            msg.reply(ctx.cache_http, e.to_string()).await?;
        }
    }
    Ok(())
}

async fn remove(ctx: &Context<'_>, msg: &Message, args: &str) -> Result<()> {
    let (selector, _) = take_word(args);

    match selector {
        "" => {
            let prefix = &ctx.cfg.read().await.general.command_prefix;
            msg.reply(
                ctx.cache_http,
                format!("Usage: `{}timer remove <id|last|all>`.", prefix),
            )
            .await?;
            Ok(())
        }
        "all" => remove_all(ctx, msg).await,
        "last" => {
            let mut pstate = ctx.pstate.write().await;
            match pstate.timers.remove_last(msg.author.id) {
                Some(removed) => {
                    pstate.save().await?;
                    drop(pstate);
                    msg.reply(
                        ctx.cache_http,
                        format!(
                            "Your most recently created timer (ID# **{}**) has been removed.",
                            removed.user_timer_id
                        ),
                    )
                    .await?;
                }
                None => {
                    drop(pstate);
                    msg.reply(ctx.cache_http, "You don't have any upcoming timers.")
                        .await?;
                }
            }
            Ok(())
        }
        _ => {
            let Ok(timer_id) = selector.parse::<u32>() else {
                msg.reply(
                    ctx.cache_http,
                    "That isn't a timer ID, `last`, or `all`.",
                )
                .await?;
                return Ok(());
            };

            let mut pstate = ctx.pstate.write().await;
            match pstate.timers.remove(msg.author.id, timer_id) {
                Ok(_) => {
                    pstate.save().await?;
                    drop(pstate);
                    msg.reply(
                        ctx.cache_http,
                        format!("Timer with ID# **{}** has been removed.", timer_id),
                    )
                    .await?;
                }
                Err(e) => {
                    drop(pstate);
                    msg.reply(ctx.cache_http, e.to_string()).await?;
                }
            }
            Ok(())
        }
    }
}

/// `;timer remove all`: asks for confirmation and waits, bounded, for a yes/no answer.
/// Timing out or answering anything but yes leaves the timers untouched.
async fn remove_all(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    if ctx
        .pstate
        .read()
        .await
        .timers
        .for_user(msg.author.id)
        .next()
        .is_none()
    {
        msg.reply(ctx.cache_http, "You don't have any upcoming timers.")
            .await?;
        return Ok(());
    }

    let timeout = {
        let secs = ctx.cfg.read().await.timer.confirm_timeout_seconds;
        std::time::Duration::from_secs(secs)
    };

    let (tx, rx) = oneshot::channel();
    ctx.vstate
        .write()
        .await
        .confirmations
        .insert(msg.author.id, msg.channel_id, tx);

    msg.reply(
        ctx.cache_http,
        "Are you **sure** you want to remove all of your timers? (yes/no)",
    )
    .await?;

    let confirmed = matches!(tokio::time::timeout(timeout, rx).await, Ok(Ok(true)));

    // Drop the sender if the wait timed out before an answer arrived
    ctx.vstate
        .write()
        .await
        .confirmations
        .cancel(msg.author.id, msg.channel_id);

    if !confirmed {
        msg.reply(ctx.cache_http, "I have left your timers alone.")
            .await?;
        return Ok(());
    }

    let mut pstate = ctx.pstate.write().await;
    pstate.timers.remove_all(msg.author.id);
    pstate.save().await?;
    drop(pstate);

    msg.reply(ctx.cache_http, "All of your timers have been removed.")
        .await?;
    Ok(())
}

/// Bare yes/no keyword matching for confirmation replies.  Anything else is not an answer.
fn parse_confirmation(content: &str) -> Option<bool> {
    match content.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Route a yes/no message to a waiting `remove all` confirmation, if any.  Other messages from
/// the same user pass through to normal command handling.
async fn try_answer_confirmation(ctx: &Context<'_>, msg: &Message) -> bool {
    let Some(answer) = parse_confirmation(&msg.content) else {
        return false;
    };

    let tx = ctx
        .vstate
        .write()
        .await
        .confirmations
        .take(msg.author.id, msg.channel_id);

    match tx {
        Some(tx) => {
            let _ = tx.send(answer);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_cancel_words() {
        for word in ["0", "stop", "none", "FALSE", "No", "cancel", "n"] {
            assert!(
                REPEAT_CANCEL_WORDS
                    .iter()
                    .any(|w| word.eq_ignore_ascii_case(w)),
                "{} should cancel",
                word
            );
        }
        assert!(!REPEAT_CANCEL_WORDS.iter().any(|w| "30m".eq_ignore_ascii_case(w)));
    }

    #[test]
    fn take_word_splits_and_trims() {
        assert_eq!(take_word("list id"), ("list", "id"));
        assert_eq!(take_word("  modify  time 3  "), ("modify", "time 3  "));
        assert_eq!(take_word("remove"), ("remove", ""));
        assert_eq!(take_word(""), ("", ""));
    }

    #[test]
    fn full_timer_set_is_reported_before_parsing() {
        use serenity::all::{ChannelId, UserId};

        let user = UserId::new(1);
        let mut timers = store::Timers::default();
        for _ in 0..2 {
            timers
                .create(
                    user,
                    ChannelId::new(9),
                    Duration::from_secs(300),
                    None,
                    "stretch",
                    0,
                    2,
                )
                .unwrap();
        }

        // Malformed text from a user at the cap still gets the cap message
        let err = parse_create_request(&timers, user, "in 9 days of gibberish", 2).unwrap_err();
        assert_eq!(err, TimerError::LimitExceeded(2));

        // A user below the cap gets the parse result instead
        let err = parse_create_request(&timers, UserId::new(2), "in 9 days", 2).unwrap_err();
        assert!(matches!(err, TimerError::Invalid(_)));
    }

    #[test]
    fn confirmation_keywords() {
        assert_eq!(parse_confirmation("yes"), Some(true));
        assert_eq!(parse_confirmation("  Y "), Some(true));
        assert_eq!(parse_confirmation("No"), Some(false));
        assert_eq!(parse_confirmation("n"), Some(false));
        assert_eq!(parse_confirmation("yes please"), None);
        assert_eq!(parse_confirmation(""), None);
    }
}
