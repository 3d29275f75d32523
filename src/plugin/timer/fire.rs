//! Background loop that delivers due timers and reschedules repeats.
//!
//! Spawned once when the Discord connection is ready.  Command handlers never deliver timers
//! themselves; they only write records that this loop later consumes.

use super::epoch_now;
use crate::{
    config::Config, log_event, log_internal, logging::AsyncPrintColor,
    persistent_state::PersistentState,
};
use serenity::all::Http;
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;

pub async fn run(
    cfg: Arc<RwLock<Config>>,
    pstate: Arc<RwLock<PersistentState>>,
    http: Arc<Http>,
) {
    let interval = {
        let secs = cfg.read().await.timer.fire_check_interval_seconds;
        Duration::from_secs(secs.max(1))
    };
    log_internal!(
        "Timer firing loop running, checking every {} second(s)",
        interval.as_secs()
    );

    loop {
        tokio::time::sleep(interval).await;
        if let Err(e) = tick(&pstate, &http).await {
            log_internal!("Timer firing loop: {}", e);
        }
    }
}

async fn tick(pstate: &RwLock<PersistentState>, http: &Arc<Http>) -> anyhow::Result<()> {
    let now = epoch_now();
    let due = pstate.read().await.timers.due(now);

    for record in due {
        let content = if record.label.is_empty() {
            format!("<@{}> \u{23F0} This is your timer!", record.user_id)
        } else {
            format!("<@{}> \u{23F0} {}", record.user_id, record.label)
        };

        match record.origin_channel.say(http, content).await {
            Ok(_) => log_event!(
                "Delivered timer #{} to {}",
                record.user_timer_id,
                record.user_id.color(http).await,
            ),
            // Complete the record anyway; a dead channel must not wedge the loop on one timer
            Err(e) => log_internal!(
                "Could not deliver timer #{} for user {}: {}",
                record.user_timer_id,
                record.user_id,
                e,
            ),
        }

        let mut pstate = pstate.write().await;
        pstate
            .timers
            .complete_fired(record.user_id, record.user_timer_id, now);
        pstate.save().await?;
    }

    Ok(())
}
