//! Roleplay reaction cog: commands like `;hug @user` reply with a random reaction GIF
//! and keep per-user given/received counters in persistent state. A couple of
//! actions (`;cry`, `;smug`) take no target and count per author instead.

use crate::{event::*, helper::UserHelper, plugin::*};
use anyhow::Result;
use rand::seq::SliceRandom;
use serenity::all::{CreateEmbed, CreateEmbedFooter, CreateMessage, Message, UserId};
use std::collections::HashMap;

struct Action {
    command: &'static str,
    /// `{actor}` and `{target}` are substituted into this line.
    line: &'static str,
    /// Reply when the author targets themselves.
    self_line: &'static str,
    /// Reply when the author targets the bot.
    bot_line: &'static str,
    gifs: &'static [&'static str],
}

struct SoloAction {
    command: &'static str,
    /// `{actor}` is substituted into this line.
    line: &'static str,
    gifs: &'static [&'static str],
}

const BOT_NO_U: &str = "**Ｎ Ｏ   Ｕ**";
const BOT_BLUSH: &str = "Aww, thank you! *blushes in binary*";

const ACTIONS: &[Action] = &[
    Action {
        command: "baka",
        line: "{actor} calls {target} a baka!",
        self_line: "Calling yourself a baka? That checks out.",
        bot_line: BOT_NO_U,
        gifs: &[
            "https://media1.tenor.com/images/ca88f916b116711c60bb23b8eb608694/tenor.gif",
            "https://media1.tenor.com/images/77e86fe8ac82f5da0ba025d1a1bdcf11/tenor.gif",
            "https://media1.tenor.com/images/e93cdd02013ff5af64a25ed567840c13/tenor.gif",
        ],
    },
    Action {
        command: "bully",
        line: "{actor} bullies {target}!",
        self_line: "Don't bully yourself, you're doing fine.",
        bot_line: BOT_NO_U,
        gifs: &[
            "https://media1.tenor.com/images/69c968635cd2e70b84a84da64c21e659/tenor.gif",
            "https://media1.tenor.com/images/0f032a4083ee2a4b72ee3527071ae3cb/tenor.gif",
            "https://media1.tenor.com/images/bd1df8ae5d4e82eada5121806b585eee/tenor.gif",
        ],
    },
    Action {
        command: "cuddle",
        line: "{actor} cuddles {target}~",
        self_line: "Cuddling yourself... I guess a blanket works too.",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/ca7c3e1b4a441b4ff07a0f470d80c919/tenor.gif",
            "https://media1.tenor.com/images/2d4ee3b6bdb4b1a33fd046aca7016ca1/tenor.gif",
            "https://media1.tenor.com/images/6076c79e0ad3cbdb1a3b0c4b93214f56/tenor.gif",
        ],
    },
    Action {
        command: "feed",
        line: "{actor} feeds {target}. Yum!",
        self_line: "That's just called eating.",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/7a2e3060e7e2cf4b40b9a3e2c25e3a0f/tenor.gif",
            "https://media1.tenor.com/images/e3258dc29e18e95d5f4dba08142bd269/tenor.gif",
            "https://media1.tenor.com/images/ae8c2fa9f5e1f2f1c0e1eaea6a9cd562/tenor.gif",
        ],
    },
    Action {
        command: "highfive",
        line: "{actor} highfives {target}!",
        self_line: "Clapping with one hand, are we?",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/990d84bb0f8dce1bdbb0a8a7ce55add1/tenor.gif",
            "https://media1.tenor.com/images/e27b93bfcdb10ff533175a00eb8580af/tenor.gif",
            "https://media1.tenor.com/images/30f2cb4b61e7d29a2b798e2fdd1fc409/tenor.gif",
        ],
    },
    Action {
        command: "hug",
        line: "{actor} hugs {target}!",
        self_line: "A self-hug is still a hug. Here, have one from me too.",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/3e6a25297a121fdab968d01c1b6f2632/tenor.gif",
            "https://media1.tenor.com/images/4293a012b2e6d833d65b1f27b1a8f7e2/tenor.gif",
            "https://media1.tenor.com/images/ca2e20a569c221bd86ceec8a775428ea/tenor.gif",
            "https://media1.tenor.com/images/de23bcd4d0b8baf0958afbd04e0e3fb8/tenor.gif",
        ],
    },
    Action {
        command: "kill",
        line: "{actor} kills {target}. Oh no!",
        self_line: "Absolutely not. Have a hug instead.",
        bot_line: BOT_NO_U,
        gifs: &[
            "https://media1.tenor.com/images/8a8e36b4d9f0d2aa15c52d6b6e4e2c9e/tenor.gif",
            "https://media1.tenor.com/images/c9b2e62e8f86e0e52e29bc2e95f7de2a/tenor.gif",
            "https://media1.tenor.com/images/25e2e2aa9d7cdbc3a2a14e62ba2ed0e2/tenor.gif",
        ],
    },
    Action {
        command: "kiss",
        line: "{actor} kisses {target}~",
        self_line: "Blowing kisses at a mirror again?",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/78095c007974aceb72b91aeb7ee54a71/tenor.gif",
            "https://media1.tenor.com/images/c40d0f42a5b4ad82fbba0a3c3d5b9e11/tenor.gif",
            "https://media1.tenor.com/images/02a7f5ae9e6fd9a5c6b9f14161bd0c55/tenor.gif",
        ],
    },
    Action {
        command: "lick",
        line: "{actor} licks {target}...",
        self_line: "Licking yourself? You're not a cat.",
        bot_line: "You wanna lick a bot? Here, lick this instead: 🍆",
        gifs: &[
            "https://media1.tenor.com/images/4e0e9f2dbb3ec2a0d1e05e61b7c2f5d7/tenor.gif",
            "https://media1.tenor.com/images/9f2a0bb9e2712c76a4fd6bfcbc0ab9ea/tenor.gif",
            "https://media1.tenor.com/images/ab3bbdc0cd8f2f8e3aa5c8ed2be6c8df/tenor.gif",
        ],
    },
    Action {
        command: "nom",
        line: "{actor} noms {target}!",
        self_line: "Stop chewing on yourself.",
        bot_line: "**OH NO!** *runs away*",
        gifs: &[
            "https://media1.tenor.com/images/db5e2c1d3f2cd2a5e6d7cbdc76b4b2ad/tenor.gif",
            "https://media1.tenor.com/images/13a0cd6e2ddf20b9df6a7fa2cb0e3c0e/tenor.gif",
            "https://media1.tenor.com/images/5ee3c0a7fb2e8d6ecfb9c9baf2e1fbda/tenor.gif",
        ],
    },
    Action {
        command: "pat",
        line: "{actor} pats {target} on the head.",
        self_line: "There, there. *pats your head for you*",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/1a473e1e02b0a892fdf3d46bc41b0d54/tenor.gif",
            "https://media1.tenor.com/images/6bafd54b52a2d26e6c2f83e15d0322e1/tenor.gif",
            "https://media1.tenor.com/images/f8b7d33b5a2bdc919b8c1bb2ae2cee39/tenor.gif",
        ],
    },
    Action {
        command: "poke",
        line: "{actor} pokes {target}.",
        self_line: "Poking yourself? Whatever makes you happy.",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/1babb282f7275e489ae85e2e0c0e1c1f/tenor.gif",
            "https://media1.tenor.com/images/4fc0b6b4a3b5bd19dc8b15a39d2e07c4/tenor.gif",
            "https://media1.tenor.com/images/5b0feb9d88c9592aaa82cbfb82ad3a23/tenor.gif",
        ],
    },
    Action {
        command: "punch",
        line: "{actor} punches {target}!",
        self_line: "Please don't hit yourself.",
        bot_line: "You punch like someone who mentions a bot and hopes it has no fists.",
        gifs: &[
            "https://media1.tenor.com/images/18a923e7de0f2eac5e1e2ed0e1eddc6d/tenor.gif",
            "https://media1.tenor.com/images/b2cbdf9e872b6c2e31dfcbadfe0ce6eb/tenor.gif",
            "https://media1.tenor.com/images/cf1ed3b3a0a84ed0e1ca2e1d30bdbefd/tenor.gif",
        ],
    },
    Action {
        command: "slap",
        line: "{actor} slaps {target}!",
        self_line: "Please don't hurt yourself.",
        bot_line: BOT_NO_U,
        gifs: &[
            "https://media1.tenor.com/images/e3a299a1c91318c2e9ba7f2b4a2d1e23/tenor.gif",
            "https://media1.tenor.com/images/95fc4f4aeb9e4cbdd9b90a2a5b6fbe3f/tenor.gif",
            "https://media1.tenor.com/images/9a3efbedd086fbad0e5f0e80b2c50572/tenor.gif",
        ],
    },
    Action {
        command: "tickle",
        line: "{actor} tickles {target}!",
        self_line: "Tickling yourself never works, does it?",
        bot_line: BOT_BLUSH,
        gifs: &[
            "https://media1.tenor.com/images/67d0f8a9dd2ce2e6dfdce2b2e0fbadcf/tenor.gif",
            "https://media1.tenor.com/images/0e0cdbc2b0ad6ea2d7c9bdfae7c2e1df/tenor.gif",
            "https://media1.tenor.com/images/ffbcdde2a1b2ce0daf6ce2d0badc9e2e/tenor.gif",
        ],
    },
];

const SOLO_ACTIONS: &[SoloAction] = &[
    SoloAction {
        command: "cry",
        line: "{actor} bursts into tears... 😭",
        gifs: &[
            "https://media1.tenor.com/images/2d119ef5e2cdbc09e2ef2cd4b2e6e2da/tenor.gif",
            "https://media1.tenor.com/images/9e7e2fbfbadc2e0d6ce2b2d0c0dcbeaf/tenor.gif",
            "https://media1.tenor.com/images/cdbfe2e7a2d0ce6b9dfe2c2badc0e1ed/tenor.gif",
        ],
    },
    SoloAction {
        command: "smug",
        line: "{actor} looks entirely too smug. 😏",
        gifs: &[
            "https://media1.tenor.com/images/aeb2dfce2d0c6e9bdfe0c2e2badc1e7f/tenor.gif",
            "https://media1.tenor.com/images/1fcdbe2e7a0d2ce6b9dfc2e0badce2ad/tenor.gif",
            "https://media1.tenor.com/images/7e2badc0e1edcdbfe2e7a2d0ce6b9dfe/tenor.gif",
        ],
    },
];

/// Per-user counters of roleplay actions given (`<action>_to`), received
/// (`<action>_from`), and performed solo (`<action>_count`), persisted across restarts.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct RoleplayCounts(HashMap<UserId, HashMap<String, u64>>);

impl RoleplayCounts {
    pub fn bump(&mut self, user: UserId, key: &str) -> u64 {
        let count = self
            .0
            .entry(user)
            .or_default()
            .entry(key.to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, user: UserId, key: &str) -> u64 {
        self.0
            .get(&user)
            .and_then(|counts| counts.get(key))
            .copied()
            .unwrap_or(0)
    }
}

pub struct PluginRoleplay;

#[serenity::async_trait]
impl Plugin for PluginRoleplay {
    fn name(&self) -> &'static str {
        "roleplay"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = ctx.cfg.read().await.general.command_prefix.clone();
        let targeted: Vec<&str> = ACTIONS.iter().map(|a| a.command).collect();
        let solo: Vec<&str> = SOLO_ACTIONS.iter().map(|a| a.command).collect();
        Some(format!(
            "{}<{}> @user - react to someone with a GIF\n{}<{}> - emote on your own",
            prefix,
            targeted.join("|"),
            prefix,
            solo.join("|")
        ))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        for action in ACTIONS {
            if let Some((msg, _rest)) = event.is_bot_cmd(ctx, action.command).await {
                react(ctx, msg, action).await?;
                return Ok(EventHandled::Yes);
            }
        }
        for action in SOLO_ACTIONS {
            if let Some((msg, _rest)) = event.is_bot_cmd(ctx, action.command).await {
                emote(ctx, msg, action).await?;
                return Ok(EventHandled::Yes);
            }
        }
        Ok(EventHandled::No)
    }
}

fn pick_gif(gifs: &'static [&'static str]) -> &'static str {
    // thread_rng handles are not Send, so callers run this before any await point.
    let mut rng = rand::thread_rng();
    gifs.choose(&mut rng).copied().unwrap_or(gifs[0])
}

async fn react(ctx: &Context<'_>, msg: &Message, action: &Action) -> Result<()> {
    let Some(target) = msg.mentions.first() else {
        msg.reply(ctx.cache_http, "Mention someone to react to.")
            .await?;
        return Ok(());
    };

    if target.id == msg.author.id {
        msg.reply(ctx.cache_http, action.self_line).await?;
        return Ok(());
    }
    // Bind the ID so the cache guard is not held across the reply await
    let bot_id = ctx.cache.current_user().id;
    if target.id == bot_id {
        msg.reply(ctx.cache_http, action.bot_line).await?;
        return Ok(());
    }

    let gif = pick_gif(action.gifs);

    let (given, received) = {
        let mut pstate = ctx.pstate.write().await;
        let given = pstate
            .roleplay
            .bump(msg.author.id, &format!("{}_to", action.command));
        let received = pstate
            .roleplay
            .bump(target.id, &format!("{}_from", action.command));
        pstate.save().await?;
        (given, received)
    };

    let actor_name = msg.author.preferred_name(ctx, msg.guild_id).await;
    let target_name = target.preferred_name(ctx, msg.guild_id).await;
    let line = action
        .line
        .replace("{actor}", &actor_name)
        .replace("{target}", &target_name);
    let footer = format!(
        "{} given: {} | {} received: {}",
        actor_name, given, target_name, received
    );
    let embed = CreateEmbed::new()
        .description(line)
        .image(gif)
        .footer(CreateEmbedFooter::new(footer));
    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn emote(ctx: &Context<'_>, msg: &Message, action: &SoloAction) -> Result<()> {
    let gif = pick_gif(action.gifs);

    let count = {
        let mut pstate = ctx.pstate.write().await;
        let count = pstate
            .roleplay
            .bump(msg.author.id, &format!("{}_count", action.command));
        pstate.save().await?;
        count
    };

    let actor_name = msg.author.preferred_name(ctx, msg.guild_id).await;
    let line = action.line.replace("{actor}", &actor_name);
    let footer = format!("{} has done this {} times", actor_name, count);
    let embed = CreateEmbed::new()
        .description(line)
        .image(gif)
        .footer(CreateEmbedFooter::new(footer));
    msg.channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_one_and_increment() {
        let mut counts = RoleplayCounts::default();
        let alice = UserId::new(1);
        assert_eq!(counts.bump(alice, "hug_to"), 1);
        assert_eq!(counts.bump(alice, "hug_to"), 2);
        assert_eq!(counts.get(alice, "hug_to"), 2);
    }

    #[test]
    fn counters_are_scoped_per_user_and_key() {
        let mut counts = RoleplayCounts::default();
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        counts.bump(alice, "pat_to");
        counts.bump(bob, "pat_from");
        assert_eq!(counts.get(alice, "pat_from"), 0);
        assert_eq!(counts.get(bob, "pat_from"), 1);
        assert_eq!(counts.get(bob, "pat_to"), 0);
    }

    #[test]
    fn solo_counters_use_their_own_key() {
        let mut counts = RoleplayCounts::default();
        let alice = UserId::new(1);
        assert_eq!(counts.bump(alice, "cry_count"), 1);
        assert_eq!(counts.get(alice, "cry_to"), 0);
        assert_eq!(counts.get(alice, "cry_from"), 0);
    }

    #[test]
    fn every_action_has_gifs() {
        for action in ACTIONS {
            assert!(!action.gifs.is_empty(), "{} has no GIFs", action.command);
        }
        for action in SOLO_ACTIONS {
            assert!(!action.gifs.is_empty(), "{} has no GIFs", action.command);
        }
    }

    #[test]
    fn action_commands_are_unique() {
        let mut commands: Vec<&str> = ACTIONS
            .iter()
            .map(|a| a.command)
            .chain(SOLO_ACTIONS.iter().map(|a| a.command))
            .collect();
        let total = commands.len();
        commands.sort_unstable();
        commands.dedup();
        assert_eq!(commands.len(), total);
    }
}
