//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum which is offered to each
//! plugin in turn.

use crate::{context::Context, log_internal};
use serenity::all::{Message, Ready};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        // Nothing here reacts to bots, ourselves included.
        if let Event::Message(msg) = &self {
            if msg.author.bot {
                return;
            }
        }

        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => log_internal!("Error in plugin {}: {}", plugin.name(), err),
            }
        }
    }

    /// Check if a message should be interpreted as a special bot command.
    ///
    /// These are typically prefixed with a semicolon, e.g. `;timer list`.  Returns the message
    /// and the text following the command word.
    pub async fn is_bot_cmd<'e>(
        &'e self,
        ctx: &Context<'_>,
        cmd: &str,
    ) -> Option<(&'e Message, &'e str)> {
        let Event::Message(msg) = self else {
            return None;
        };

        let prefix = ctx.cfg.read().await.general.command_prefix.clone();
        let content = msg.content.trim();
        let first = content.split_ascii_whitespace().next()?;
        if first.strip_prefix(prefix.as_str()) != Some(cmd) {
            return None;
        }

        Some((msg, content[first.len()..].trim_start()))
    }
}

pub enum EventHandled {
    Yes,
    No,
}
