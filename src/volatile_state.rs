use serenity::all::{ChannelId, UserId};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// State which is lost across sessions
pub struct VolatileState {
    pub confirmations: Confirmations,
}

impl VolatileState {
    pub fn new() -> Self {
        Self {
            confirmations: Confirmations::new(),
        }
    }
}

/// Pending interactive yes/no questions, keyed by who asked and where.
///
/// A plugin awaiting an answer parks a oneshot sender here and waits on the receiver with a
/// timeout.  The next yes/no message from that user in that channel is routed to the sender
/// instead of through normal command dispatch.
pub struct Confirmations(HashMap<(UserId, ChannelId), oneshot::Sender<bool>>);

impl Confirmations {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, user_id: UserId, channel_id: ChannelId, tx: oneshot::Sender<bool>) {
        self.0.insert((user_id, channel_id), tx);
    }

    pub fn take(&mut self, user_id: UserId, channel_id: ChannelId) -> Option<oneshot::Sender<bool>> {
        self.0.remove(&(user_id, channel_id))
    }

    pub fn cancel(&mut self, user_id: UserId, channel_id: ChannelId) {
        self.0.remove(&(user_id, channel_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::error::TryRecvError;

    #[test]
    fn answers_route_by_user_and_channel() {
        let mut confirmations = Confirmations::new();
        let (tx, mut rx) = oneshot::channel();
        confirmations.insert(UserId::new(1), ChannelId::new(10), tx);

        // Same channel, different user; same user, different channel
        assert!(confirmations.take(UserId::new(2), ChannelId::new(10)).is_none());
        assert!(confirmations.take(UserId::new(1), ChannelId::new(11)).is_none());

        let tx = confirmations.take(UserId::new(1), ChannelId::new(10)).unwrap();
        tx.send(true).unwrap();
        assert_eq!(rx.try_recv().ok(), Some(true));
    }

    #[test]
    fn taking_an_answer_consumes_the_question() {
        let mut confirmations = Confirmations::new();
        let (tx, _rx) = oneshot::channel();
        confirmations.insert(UserId::new(1), ChannelId::new(10), tx);

        assert!(confirmations.take(UserId::new(1), ChannelId::new(10)).is_some());
        assert!(confirmations.take(UserId::new(1), ChannelId::new(10)).is_none());
    }

    #[test]
    fn cancel_drops_the_sender() {
        let mut confirmations = Confirmations::new();
        let (tx, mut rx) = oneshot::channel::<bool>();
        confirmations.insert(UserId::new(1), ChannelId::new(10), tx);
        confirmations.cancel(UserId::new(1), ChannelId::new(10));

        // A waiter still holding the receiver sees a closed channel, not an answer
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
        assert!(confirmations.take(UserId::new(1), ChannelId::new(10)).is_none());
    }

    #[test]
    fn reasking_replaces_the_pending_question() {
        let mut confirmations = Confirmations::new();
        let (tx_old, mut rx_old) = oneshot::channel::<bool>();
        confirmations.insert(UserId::new(1), ChannelId::new(10), tx_old);
        let (tx_new, mut rx_new) = oneshot::channel::<bool>();
        confirmations.insert(UserId::new(1), ChannelId::new(10), tx_new);

        // The superseded waiter observes a drop and treats it as declined
        assert!(matches!(rx_old.try_recv(), Err(TryRecvError::Closed)));

        let tx = confirmations.take(UserId::new(1), ChannelId::new(10)).unwrap();
        tx.send(false).unwrap();
        assert_eq!(rx_new.try_recv().ok(), Some(false));
    }
}
