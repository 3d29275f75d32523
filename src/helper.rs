//! Miscellaneous convenience methods

use crate::context::Context;
use serenity::all::GuildId;

#[serenity::async_trait]
pub trait UserHelper {
    /// Guild nickname when one is set, global username otherwise (e.g. in DMs)
    async fn preferred_name(&self, ctx: &Context, guild_id: Option<GuildId>) -> String;
}

#[serenity::async_trait]
impl UserHelper for serenity::all::User {
    async fn preferred_name(&self, ctx: &Context, guild_id: Option<GuildId>) -> String {
        if let Some(guild_id) = guild_id {
            if let Some(nick) = self.nick_in(ctx.cache_http, guild_id).await {
                return nick;
            }
        }
        self.name.clone()
    }
}

#[serenity::async_trait]
pub trait MessageHelper {
    async fn is_from_owner(&self, ctx: &Context) -> bool;
}

#[serenity::async_trait]
impl MessageHelper for serenity::all::Message {
    async fn is_from_owner(&self, ctx: &Context) -> bool {
        let cfg = ctx.cfg.read().await;
        cfg.general
            .bot_owners
            .iter()
            .any(|owner| owner == &self.author.name)
    }
}
