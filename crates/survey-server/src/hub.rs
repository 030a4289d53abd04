//! Mission-scoped broadcast hub for live drone positions.
//!
//! Each observer gets a bounded queue. A client that stops reading loses
//! positions once its queue is full; the others are unaffected. Group
//! membership lives only in process memory.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use survey_core::PositionUpdate;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Positions queued per observer before new ones are dropped.
pub const OBSERVER_QUEUE: usize = 256;

pub type ObserverId = u64;

/// Receiving side handed to a connected client.
pub struct Observer {
    pub id: ObserverId,
    pub updates: Receiver<Arc<PositionUpdate>>,
}

#[derive(Default)]
pub struct Hub {
    groups: DashMap<String, HashMap<ObserverId, Sender<Arc<PositionUpdate>>>>,
    observers: DashMap<ObserverId, ObserverEntry>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

struct ObserverEntry {
    sender: Sender<Arc<PositionUpdate>>,
    missions: HashSet<String>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer. After `shutdown` the returned channel is
    /// already closed.
    pub fn connect(&self) -> Observer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, updates) = mpsc::channel(OBSERVER_QUEUE);
        if !self.closed.load(Ordering::Acquire) {
            self.observers.insert(
                id,
                ObserverEntry {
                    sender,
                    missions: HashSet::new(),
                },
            );
            tracing::debug!("Observer {} connected", id);
        }
        Observer { id, updates }
    }

    /// Add an observer to a mission's group. Unknown observers are ignored.
    pub fn subscribe(&self, observer: ObserverId, mission_id: &str) -> bool {
        let Some(mut entry) = self.observers.get_mut(&observer) else {
            return false;
        };
        entry.missions.insert(mission_id.to_string());
        self.groups
            .entry(mission_id.to_string())
            .or_default()
            .insert(observer, entry.sender.clone());
        tracing::debug!("Observer {} joined mission {}", observer, mission_id);
        true
    }

    pub fn unsubscribe(&self, observer: ObserverId, mission_id: &str) {
        if let Some(mut entry) = self.observers.get_mut(&observer) {
            entry.missions.remove(mission_id);
        }
        self.leave_group(observer, mission_id);
    }

    /// Remove the observer from every group.
    pub fn disconnect(&self, observer: ObserverId) {
        if let Some((_, entry)) = self.observers.remove(&observer) {
            for mission_id in &entry.missions {
                self.leave_group(observer, mission_id);
            }
            tracing::debug!("Observer {} disconnected", observer);
        }
    }

    /// Queue for every observer in `update.mission_id`'s group. Returns the
    /// number of observers that accepted it; a group with no members is a
    /// no-op. Closed observers are dropped from the group.
    pub fn publish_position(&self, update: PositionUpdate) -> usize {
        let Some(mut group) = self.groups.get_mut(&update.mission_id) else {
            return 0;
        };
        let update = Arc::new(update);
        let mut delivered = 0;
        group.retain(|observer, sender| match sender.try_send(update.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(
                    "Observer {} is behind; dropped position for mission {}",
                    observer,
                    update.mission_id
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }

    pub fn group_size(&self, mission_id: &str) -> usize {
        self.groups.get(mission_id).map_or(0, |g| g.len())
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Drop every group and close every observer channel.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.groups.clear();
        self.observers.clear();
        tracing::info!("Broadcast hub shut down");
    }

    fn leave_group(&self, observer: ObserverId, mission_id: &str) {
        if let Some(mut group) = self.groups.get_mut(mission_id) {
            group.remove(&observer);
        }
        self.groups.remove_if(mission_id, |_, group| group.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(mission_id: &str, seq: u64) -> PositionUpdate {
        serde_json::from_value(json!({
            "missionId": mission_id,
            "position": [-117.8, 33.6],
            "seq": seq,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn delivers_only_to_group_members_in_order() {
        let hub = Hub::new();
        let mut a = hub.connect();
        let mut b = hub.connect();
        hub.subscribe(a.id, "m-1");
        hub.subscribe(b.id, "m-2");

        assert_eq!(hub.publish_position(update("m-1", 1)), 1);
        assert_eq!(hub.publish_position(update("m-1", 2)), 1);

        assert_eq!(a.updates.recv().await.unwrap().payload["seq"], 1);
        assert_eq!(a.updates.recv().await.unwrap().payload["seq"], 2);
        assert!(b.updates.try_recv().is_err());
    }

    #[test]
    fn publish_without_members_is_silent() {
        let hub = Hub::new();
        assert_eq!(hub.publish_position(update("nobody", 1)), 0);
    }

    #[test]
    fn unsubscribe_and_disconnect_leave_groups() {
        let hub = Hub::new();
        let a = hub.connect();
        hub.subscribe(a.id, "m-1");
        hub.subscribe(a.id, "m-2");
        assert_eq!(hub.group_size("m-1"), 1);

        hub.unsubscribe(a.id, "m-1");
        assert_eq!(hub.group_size("m-1"), 0);
        assert_eq!(hub.group_size("m-2"), 1);

        hub.disconnect(a.id);
        assert_eq!(hub.group_size("m-2"), 0);
        assert_eq!(hub.observer_count(), 0);
        assert!(!hub.subscribe(a.id, "m-3"));
    }

    #[tokio::test]
    async fn stalled_observer_queue_stays_bounded() {
        let hub = Hub::new();
        let mut stalled = hub.connect();
        let mut live = hub.connect();
        hub.subscribe(stalled.id, "m-1");
        hub.subscribe(live.id, "m-1");

        let total = OBSERVER_QUEUE as u64 + 50;
        for seq in 1..=total {
            let reached = hub.publish_position(update("m-1", seq));
            assert!(reached >= 1);
            // The reading observer keeps up.
            assert_eq!(live.updates.recv().await.unwrap().payload["seq"], seq);
        }
        assert_eq!(hub.group_size("m-1"), 2);

        // Only the first OBSERVER_QUEUE positions were kept, in order.
        let mut drained = Vec::new();
        while let Ok(update) = stalled.updates.try_recv() {
            drained.push(update.payload["seq"].as_u64().unwrap());
        }
        assert_eq!(drained.len(), OBSERVER_QUEUE);
        assert_eq!(drained.first(), Some(&1));
        assert_eq!(drained.last(), Some(&(OBSERVER_QUEUE as u64)));

        // Room again once drained.
        assert_eq!(hub.publish_position(update("m-1", total + 1)), 2);
        assert_eq!(stalled.updates.recv().await.unwrap().payload["seq"], total + 1);
    }

    #[test]
    fn dropped_receiver_leaves_group_on_publish() {
        let hub = Hub::new();
        let gone = hub.connect();
        hub.subscribe(gone.id, "m-1");
        drop(gone);

        assert_eq!(hub.publish_position(update("m-1", 1)), 0);
        assert_eq!(hub.group_size("m-1"), 0);
    }

    #[tokio::test]
    async fn shutdown_closes_observers() {
        let hub = Hub::new();
        let mut a = hub.connect();
        hub.subscribe(a.id, "m-1");
        hub.shutdown();

        assert!(a.updates.recv().await.is_none());
        assert_eq!(hub.publish_position(update("m-1", 1)), 0);

        let mut late = hub.connect();
        assert!(late.updates.recv().await.is_none());
    }
}
