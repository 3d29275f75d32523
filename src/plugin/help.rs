//! `;help`: assembles the command reference from each plugin's own usage text.

use crate::{event::*, plugin::*};
use anyhow::Result;

pub struct Help;

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!("{}{} - show this command reference", prefix, self.name()))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        // One block per plugin, blank-line separated so multi-line entries
        // such as the timer commands stay grouped together.
        let mut sections = Vec::new();
        for plugin in crate::plugin::plugins() {
            if let Some(usage) = plugin.usage(ctx).await {
                sections.push(usage);
            }
        }

        let prefix = ctx.cfg.read().await.general.command_prefix.clone();
        let reply = format!(
            "```\nowobot commands (prefix `{}`):\n\n{}\n```",
            prefix,
            sections.join("\n\n")
        );
        msg.reply(ctx.cache_http, reply).await?;
        Ok(EventHandled::Yes)
    }
}
