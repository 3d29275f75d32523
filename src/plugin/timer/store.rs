//! The persisted timer collection and its lifecycle operations.
//!
//! `Timers` lives inside `PersistentState`; callers take the surrounding write lock, call one
//! mutation here, and save before releasing it, so every operation below is one atomic
//! read-modify-write transaction.  Edits replace a record wholesale (remove the old identity,
//! append the new one) so a concurrent reader never observes a half-updated record.

use super::duration::humanize;
use super::TimerError;
use serenity::all::{ChannelId, UserId};
use std::time::Duration;

/// Longest allowed timer text
pub const MAX_LABEL_CHARS: usize = 250;

/// One scheduled reminder
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimerRecord {
    /// Unique within the owning user's timer set only; allocated max + 1, never reused
    pub user_timer_id: u32,
    pub user_id: UserId,
    /// Free text delivered when the timer fires; may be empty
    pub label: String,
    /// Epoch seconds of the next firing
    pub due_at: u64,
    /// Human rendering of the original one-shot duration.  Kept for display; repeat
    /// reschedules move `due_at` without touching this.
    pub due_in_text: String,
    /// Seconds between repeated firings; `None` is a one-shot timer
    pub repeat_interval: Option<u64>,
    /// Where the reminder is delivered
    pub origin_channel: ChannelId,
}

impl TimerRecord {
    pub fn due_in(&self, now: u64) -> u64 {
        self.due_at.saturating_sub(now)
    }
}

/// How `;timer list` orders a user's records
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Soonest firing first
    Time,
    /// Insertion order
    Added,
    /// `user_timer_id` ascending
    Id,
}

impl std::str::FromStr for SortKey {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "time" => Ok(SortKey::Time),
            "added" => Ok(SortKey::Added),
            "id" => Ok(SortKey::Id),
            _ => Err(TimerError::Invalid(
                "Valid sorting options are: `time` (default), `added`, or `id`.".to_string(),
            )),
        }
    }
}

/// Ordered collection of all timers across all users
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Timers(Vec<TimerRecord>);

impl Timers {
    pub fn for_user(&self, user_id: UserId) -> impl Iterator<Item = &TimerRecord> {
        self.0.iter().filter(move |t| t.user_id == user_id)
    }

    pub fn get(&self, user_id: UserId, timer_id: u32) -> Option<&TimerRecord> {
        self.for_user(user_id)
            .find(|t| t.user_timer_id == timer_id)
    }

    /// Next ID for this user: one past the highest ever seen among their current records.
    /// Deleting a timer does not free its ID for reuse.
    fn next_user_timer_id(&self, user_id: UserId) -> u32 {
        self.for_user(user_id)
            .map(|t| t.user_timer_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    fn index_of(&self, user_id: UserId, timer_id: u32) -> Option<usize> {
        self.0
            .iter()
            .position(|t| t.user_id == user_id && t.user_timer_id == timer_id)
    }

    /// Cap check on its own so callers can report a full timer set before doing any other
    /// work on the request.
    pub fn check_capacity(
        &self,
        user_id: UserId,
        max_user_timers: usize,
    ) -> Result<(), TimerError> {
        if self.for_user(user_id).count() >= max_user_timers {
            return Err(TimerError::LimitExceeded(max_user_timers));
        }
        Ok(())
    }

    pub fn create(
        &mut self,
        user_id: UserId,
        origin_channel: ChannelId,
        duration: Duration,
        repeat: Option<Duration>,
        label: &str,
        now: u64,
        max_user_timers: usize,
    ) -> Result<TimerRecord, TimerError> {
        self.check_capacity(user_id, max_user_timers)?;
        if label.chars().count() > MAX_LABEL_CHARS {
            return Err(TimerError::Invalid("Your timer text is too long.".to_string()));
        }

        let record = TimerRecord {
            user_timer_id: self.next_user_timer_id(user_id),
            user_id,
            label: label.to_string(),
            due_at: now + duration.as_secs(),
            due_in_text: humanize(duration),
            repeat_interval: repeat.map(|r| r.as_secs()),
            origin_channel,
        };
        self.0.push(record.clone());
        Ok(record)
    }

    pub fn list(&self, user_id: UserId, sort: SortKey) -> Vec<TimerRecord> {
        let mut records: Vec<TimerRecord> = self.for_user(user_id).cloned().collect();
        match sort {
            SortKey::Time => records.sort_by_key(|t| t.due_at),
            SortKey::Added => {}
            SortKey::Id => records.sort_by_key(|t| t.user_timer_id),
        }
        records
    }

    /// Remove-then-append replacement; `user_timer_id` is stable across edits.
    fn replace(
        &mut self,
        user_id: UserId,
        timer_id: u32,
        edit: impl FnOnce(&mut TimerRecord),
    ) -> Result<TimerRecord, TimerError> {
        let index = self
            .index_of(user_id, timer_id)
            .ok_or(TimerError::NotFound(timer_id))?;
        let mut record = self.0.remove(index);
        edit(&mut record);
        self.0.push(record.clone());
        Ok(record)
    }

    pub fn modify_time(
        &mut self,
        user_id: UserId,
        timer_id: u32,
        duration: Duration,
        now: u64,
    ) -> Result<TimerRecord, TimerError> {
        self.replace(user_id, timer_id, |record| {
            record.due_at = now + duration.as_secs();
            record.due_in_text = humanize(duration);
        })
    }

    pub fn modify_repeat(
        &mut self,
        user_id: UserId,
        timer_id: u32,
        repeat: Option<Duration>,
    ) -> Result<TimerRecord, TimerError> {
        self.replace(user_id, timer_id, |record| {
            record.repeat_interval = repeat.map(|r| r.as_secs());
        })
    }

    pub fn modify_text(
        &mut self,
        user_id: UserId,
        timer_id: u32,
        text: &str,
    ) -> Result<TimerRecord, TimerError> {
        // Existence first, so an unknown ID reports NotFound rather than a length complaint
        self.index_of(user_id, timer_id)
            .ok_or(TimerError::NotFound(timer_id))?;
        if text.chars().count() > MAX_LABEL_CHARS {
            return Err(TimerError::Invalid("Your timer text is too long.".to_string()));
        }
        self.replace(user_id, timer_id, |record| {
            record.label = text.to_string();
        })
    }

    pub fn remove(&mut self, user_id: UserId, timer_id: u32) -> Result<TimerRecord, TimerError> {
        let index = self
            .index_of(user_id, timer_id)
            .ok_or(TimerError::NotFound(timer_id))?;
        Ok(self.0.remove(index))
    }

    /// Remove the user's most recently stored record
    pub fn remove_last(&mut self, user_id: UserId) -> Option<TimerRecord> {
        let index = self.0.iter().rposition(|t| t.user_id == user_id)?;
        Some(self.0.remove(index))
    }

    /// Remove every record owned by the user, returning how many there were
    pub fn remove_all(&mut self, user_id: UserId) -> usize {
        let before = self.0.len();
        self.0.retain(|t| t.user_id != user_id);
        before - self.0.len()
    }

    /// Snapshot of every record due at `now`, for the firing loop
    pub fn due(&self, now: u64) -> Vec<TimerRecord> {
        self.0
            .iter()
            .filter(|t| t.due_at <= now)
            .cloned()
            .collect()
    }

    /// Called by the firing loop after delivering a timer: one-shots are removed, repeating
    /// timers advance past `now` in whole repeat intervals.
    pub fn complete_fired(&mut self, user_id: UserId, timer_id: u32, now: u64) {
        let Some(index) = self.index_of(user_id, timer_id) else {
            // Deleted between snapshot and delivery; nothing to do
            return;
        };

        match self.0[index].repeat_interval {
            Some(interval) if interval > 0 => {
                let mut record = self.0.remove(index);
                while record.due_at <= now {
                    record.due_at += interval;
                }
                self.0.push(record);
            }
            _ => {
                self.0.remove(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOW: u64 = 1_700_000_000;
    const MAX: usize = 10;

    fn user(n: u64) -> UserId {
        UserId::new(n)
    }

    fn channel() -> ChannelId {
        ChannelId::new(42)
    }

    fn create(timers: &mut Timers, user_id: UserId, secs: u64, label: &str) -> TimerRecord {
        timers
            .create(
                user_id,
                channel(),
                Duration::from_secs(secs),
                None,
                label,
                NOW,
                MAX,
            )
            .unwrap()
    }

    #[test]
    fn first_timer_gets_id_one() {
        let mut timers = Timers::default();
        let record = create(&mut timers, user(1), 300, "tea");
        assert_eq!(record.user_timer_id, 1);
        assert_eq!(record.due_at, NOW + 300);
        assert_eq!(record.due_in_text, "5 minutes");
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut timers = Timers::default();
        for i in 0..3 {
            let record = create(&mut timers, user(1), 300 + i, "x");
            assert_eq!(record.user_timer_id, i as u32 + 1);
        }

        timers.remove(user(1), 2).unwrap();
        let record = create(&mut timers, user(1), 600, "y");
        assert_eq!(record.user_timer_id, 4);
    }

    #[test]
    fn ids_are_scoped_per_user() {
        let mut timers = Timers::default();
        create(&mut timers, user(1), 300, "a");
        let record = create(&mut timers, user(2), 300, "b");
        assert_eq!(record.user_timer_id, 1);
    }

    #[test]
    fn create_rejects_at_limit() {
        let mut timers = Timers::default();
        for _ in 0..MAX {
            create(&mut timers, user(1), 300, "x");
        }
        let err = timers
            .create(
                user(1),
                channel(),
                Duration::from_secs(300),
                None,
                "one more",
                NOW,
                MAX,
            )
            .unwrap_err();
        assert_eq!(err, TimerError::LimitExceeded(MAX));
        // Other users are unaffected by someone else's full set
        create(&mut timers, user(2), 300, "fine");
    }

    #[test]
    fn create_rejects_long_label() {
        let mut timers = Timers::default();
        let long = "x".repeat(MAX_LABEL_CHARS + 1);
        let err = timers
            .create(
                user(1),
                channel(),
                Duration::from_secs(300),
                None,
                &long,
                NOW,
                MAX,
            )
            .unwrap_err();
        assert!(matches!(err, TimerError::Invalid(_)));
    }

    #[test]
    fn modify_text_is_an_atomic_replace() {
        let mut timers = Timers::default();
        for i in 1..=5 {
            create(&mut timers, user(1), 100 * i, "x");
        }

        timers.modify_text(user(1), 5, "new text").unwrap();

        let with_id_5: Vec<_> = timers
            .for_user(user(1))
            .filter(|t| t.user_timer_id == 5)
            .collect();
        assert_eq!(with_id_5.len(), 1);
        assert_eq!(with_id_5[0].label, "new text");
        assert_eq!(timers.for_user(user(1)).count(), 5);
    }

    #[test]
    fn modify_time_preserves_label_and_repeat() {
        let mut timers = Timers::default();
        timers
            .create(
                user(1),
                channel(),
                Duration::from_secs(600),
                Some(Duration::from_secs(1800)),
                "water",
                NOW,
                MAX,
            )
            .unwrap();

        let record = timers
            .modify_time(user(1), 1, Duration::from_secs(7200), NOW)
            .unwrap();
        assert_eq!(record.due_at, NOW + 7200);
        assert_eq!(record.due_in_text, "2 hours");
        assert_eq!(record.label, "water");
        assert_eq!(record.repeat_interval, Some(1800));
        assert_eq!(record.user_timer_id, 1);
    }

    #[test]
    fn modify_repeat_cancel_keeps_due_in_text() {
        let mut timers = Timers::default();
        timers
            .create(
                user(1),
                channel(),
                Duration::from_secs(600),
                Some(Duration::from_secs(1800)),
                "water",
                NOW,
                MAX,
            )
            .unwrap();

        let record = timers.modify_repeat(user(1), 1, None).unwrap();
        assert_eq!(record.repeat_interval, None);
        assert_eq!(record.due_in_text, "10 minutes");
    }

    #[test]
    fn modify_unknown_id_is_not_found() {
        let mut timers = Timers::default();
        create(&mut timers, user(1), 300, "x");
        assert_eq!(
            timers.modify_text(user(1), 7, "y").unwrap_err(),
            TimerError::NotFound(7)
        );
        // Another user's ID does not reach across ownership
        assert_eq!(
            timers
                .modify_time(user(2), 1, Duration::from_secs(300), NOW)
                .unwrap_err(),
            TimerError::NotFound(1)
        );
    }

    #[test]
    fn list_sort_orders() {
        let mut timers = Timers::default();
        create(&mut timers, user(1), 900, "slow");
        create(&mut timers, user(1), 60, "fast");
        create(&mut timers, user(1), 300, "medium");

        let by_time: Vec<u32> = timers
            .list(user(1), SortKey::Time)
            .iter()
            .map(|t| t.user_timer_id)
            .collect();
        assert_eq!(by_time, vec![2, 3, 1]);

        let by_id: Vec<u32> = timers
            .list(user(1), SortKey::Id)
            .iter()
            .map(|t| t.user_timer_id)
            .collect();
        assert_eq!(by_id, vec![1, 2, 3]);

        let by_added: Vec<String> = timers
            .list(user(1), SortKey::Added)
            .iter()
            .map(|t| t.label.clone())
            .collect();
        assert_eq!(by_added, vec!["slow", "fast", "medium"]);
    }

    #[test]
    fn invalid_sort_key_reports_options() {
        let err = "soonest".parse::<SortKey>().unwrap_err();
        assert!(err.to_string().contains("`time`"));
    }

    #[test]
    fn remove_last_takes_most_recent() {
        let mut timers = Timers::default();
        create(&mut timers, user(1), 300, "first");
        create(&mut timers, user(2), 300, "other user");
        create(&mut timers, user(1), 600, "second");

        let removed = timers.remove_last(user(1)).unwrap();
        assert_eq!(removed.label, "second");
        assert_eq!(timers.for_user(user(1)).count(), 1);
        assert_eq!(timers.for_user(user(2)).count(), 1);
    }

    #[test]
    fn remove_all_is_scoped_to_one_user() {
        let mut timers = Timers::default();
        create(&mut timers, user(1), 300, "a");
        create(&mut timers, user(1), 600, "b");
        create(&mut timers, user(2), 300, "c");

        assert_eq!(timers.remove_all(user(1)), 2);
        assert_eq!(timers.for_user(user(1)).count(), 0);
        assert_eq!(timers.for_user(user(2)).count(), 1);
    }

    #[test]
    fn fired_one_shot_is_removed() {
        let mut timers = Timers::default();
        create(&mut timers, user(1), 60, "x");

        let due = timers.due(NOW + 61);
        assert_eq!(due.len(), 1);

        timers.complete_fired(user(1), 1, NOW + 61);
        assert_eq!(timers.for_user(user(1)).count(), 0);
    }

    #[test]
    fn fired_repeat_advances_past_now() {
        let mut timers = Timers::default();
        timers
            .create(
                user(1),
                channel(),
                Duration::from_secs(60),
                Some(Duration::from_secs(600)),
                "water",
                NOW,
                MAX,
            )
            .unwrap();

        // Fired late, more than one interval after the due time
        let late = NOW + 60 + 1500;
        timers.complete_fired(user(1), 1, late);

        let record = timers.get(user(1), 1).unwrap();
        assert!(record.due_at > late);
        assert_eq!(record.due_at, NOW + 60 + 3 * 600);
        // The original one-shot rendering is untouched by rescheduling
        assert_eq!(record.due_in_text, "1 minute");
    }
}
