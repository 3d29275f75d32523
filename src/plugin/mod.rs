pub use crate::context::Context;
use crate::event::EventHandled;
use anyhow::Result;

mod anilist;
mod debug;
mod help;
mod reload;
pub mod roleplay;
pub mod timer;
mod video2gif;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Help message line(s).  None if no help message
    async fn usage(&self, ctx: &Context) -> Option<String>;
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt
    ///   to handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &crate::event::Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    use crate::plugin::*;

    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(help::Help),
        Box::new(reload::Reload),
        // The cogs
        Box::new(timer::PluginTimer),
        Box::new(anilist::PluginAnilist),
        Box::new(roleplay::PluginRoleplay),
        Box::new(video2gif::PluginVideo2Gif),
    ]
}
