//! Round broadcaster: fan-out of round state to subscribers.
//!
//! The broadcaster is invoked by the engine actor after a state mutation
//! commits, so engine logic stays testable without a live socket.
//! Publishing never blocks: events go out with `try_send`, a full
//! subscriber channel drops that snapshot for that subscriber (they get
//! the next one), and a closed channel removes the subscriber. Per-round
//! ordering follows from publishing inside the actor's event loop.

use crate::round::entities::{RoundResult, RoundView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Events emitted on a game type's subscription stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// A fresh round opened for betting.
    RoundOpened { view: RoundView },
    /// Round state changed (join, bet, cashout, multiplier tick).
    StateUpdated { view: RoundView },
    /// The betting window closed.
    RoundLocked { view: RoundView },
    /// The round settled; for crash rounds the view reveals the crash
    /// point and for jackpot rounds the winner.
    RoundSettled {
        view: RoundView,
        result: RoundResult,
    },
}

impl RoundEvent {
    pub fn view(&self) -> &RoundView {
        match self {
            RoundEvent::RoundOpened { view }
            | RoundEvent::StateUpdated { view }
            | RoundEvent::RoundLocked { view }
            | RoundEvent::RoundSettled { view, .. } => view,
        }
    }
}

/// Identifier handed back on subscribe, used to unsubscribe.
pub type SubscriberId = u64;

/// Fan-out of round events for one game type.
pub struct RoundBroadcaster {
    subscribers: HashMap<SubscriberId, mpsc::Sender<RoundEvent>>,
    next_id: SubscriberId,
    channel_capacity: usize,
}

impl RoundBroadcaster {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            next_id: 0,
            channel_capacity,
        }
    }

    /// Register a subscriber and return its event stream.
    pub fn subscribe(&mut self) -> (SubscriberId, mpsc::Receiver<RoundEvent>) {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.insert(id, sender);
        (id, receiver)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every subscriber without blocking.
    pub fn publish(&mut self, event: &RoundEvent) {
        self.subscribers.retain(|id, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow subscriber misses this snapshot but stays
                    // subscribed for the next one
                    log::warn!("subscriber {id} channel full, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("subscriber {id} disconnected, removing");
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::entities::{GameType, RoundPhase};
    use uuid::Uuid;

    fn view(sequence: u64) -> RoundView {
        RoundView {
            round_id: Uuid::new_v4(),
            game_type: GameType::Jackpot,
            phase: RoundPhase::Open,
            sequence,
            total_stake: 0,
            seconds_remaining: 30,
            total_tickets: Some(0),
            multiplier: None,
            crash_point: None,
            winner: None,
            stakes: vec![],
            seed_digest: None,
        }
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let mut broadcaster = RoundBroadcaster::new(16);
        let (_, mut rx) = broadcaster.subscribe();

        for seq in 0..5 {
            broadcaster.publish(&RoundEvent::StateUpdated { view: view(seq) });
        }

        for seq in 0..5 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.view().sequence, seq);
        }
    }

    #[tokio::test]
    async fn full_subscriber_drops_event_but_stays() {
        let mut broadcaster = RoundBroadcaster::new(1);
        let (_, mut rx) = broadcaster.subscribe();

        broadcaster.publish(&RoundEvent::StateUpdated { view: view(1) });
        // Channel is full; this one is dropped for the subscriber
        broadcaster.publish(&RoundEvent::StateUpdated { view: view(2) });
        assert_eq!(broadcaster.subscriber_count(), 1);

        assert_eq!(rx.recv().await.unwrap().view().sequence, 1);

        // Subscriber receives the next event after draining
        broadcaster.publish(&RoundEvent::StateUpdated { view: view(3) });
        assert_eq!(rx.recv().await.unwrap().view().sequence, 3);
    }

    #[tokio::test]
    async fn closed_subscriber_is_removed() {
        let mut broadcaster = RoundBroadcaster::new(16);
        let (_, rx) = broadcaster.subscribe();
        drop(rx);

        broadcaster.publish(&RoundEvent::StateUpdated { view: view(1) });
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
