//! Recurring mission timers.
//!
//! Each recurring mission gets one tokio task that wakes once per period.
//! A firing spawns a successor only when the mission has completed; the
//! successor then takes over the timer, so one chain never has two timers.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use survey_core::{Mission, MissionStatus};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::persistence::{MissionFilter, MissionRepository};

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// What a single firing did.
#[derive(Debug, Clone, PartialEq)]
pub enum Firing {
    /// Mission not completed yet; try again next period.
    Idle,
    Spawned(Mission),
    /// Mission no longer exists or stopped recurring.
    Gone,
}

pub struct Scheduler {
    missions: Arc<dyn MissionRepository>,
    timers: DashMap<String, Timer>,
    generation: AtomicU64,
}

impl Scheduler {
    pub fn new(missions: Arc<dyn MissionRepository>) -> Arc<Self> {
        Arc::new(Self {
            missions,
            timers: DashMap::new(),
            generation: AtomicU64::new(0),
        })
    }

    /// Arm a timer for a recurring mission, replacing any existing one.
    /// Returns `false` for missions that do not recur.
    pub fn register(self: &Arc<Self>, mission: &Mission) -> bool {
        let Some(frequency) = mission.schedule.recurrence() else {
            return false;
        };
        self.cancel(&mission.id);

        let period = frequency.period();
        let mission_id = mission.id.clone();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let scheduler = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match scheduler.fire(&mission_id).await {
                    Firing::Idle => continue,
                    Firing::Spawned(successor) => {
                        scheduler.disarm(&mission_id, generation);
                        scheduler.register(&successor);
                        break;
                    }
                    Firing::Gone => {
                        scheduler.disarm(&mission_id, generation);
                        break;
                    }
                }
            }
        });

        self.timers
            .insert(mission.id.clone(), Timer { generation, handle });
        tracing::info!(
            "Armed {:?} recurrence timer for mission {}",
            frequency,
            mission.id
        );
        true
    }

    /// Disarm the mission's timer. Returns whether one was armed.
    pub fn cancel(&self, mission_id: &str) -> bool {
        match self.timers.remove(mission_id) {
            Some((_, timer)) => {
                timer.handle.abort();
                tracing::info!("Cancelled recurrence timer for mission {}", mission_id);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, mission_id: &str) -> bool {
        self.timers.contains_key(mission_id)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    /// One timer firing for `mission_id`.
    pub async fn fire(&self, mission_id: &str) -> Firing {
        let mission = match self.missions.get(mission_id).await {
            Ok(Some(mission)) => mission,
            Ok(None) => {
                tracing::debug!("Recurrence fired for deleted mission {}", mission_id);
                return Firing::Gone;
            }
            Err(err) => {
                tracing::warn!("Recurrence check for mission {} failed: {:#}", mission_id, err);
                return Firing::Idle;
            }
        };

        if mission.schedule.recurrence().is_none() || mission.status == MissionStatus::Aborted {
            return Firing::Gone;
        }
        if mission.status != MissionStatus::Completed {
            tracing::debug!(
                "Recurrence fired for mission {} while {}; waiting",
                mission_id,
                mission.status
            );
            return Firing::Idle;
        }

        let successor = mission.successor(uuid::Uuid::new_v4().to_string(), Utc::now());
        if let Err(err) = self.missions.save(&successor).await {
            tracing::warn!("Failed to spawn successor of mission {}: {:#}", mission_id, err);
            return Firing::Idle;
        }
        tracing::info!(
            "Spawned recurring mission {} from completed mission {}",
            successor.id,
            mission_id
        );
        Firing::Spawned(successor)
    }

    /// Re-arm timers for persisted recurring missions.
    ///
    /// A completed mission that some stored mission names as its predecessor
    /// already spawned its successor and stays disarmed.
    pub async fn restore(self: &Arc<Self>) -> anyhow::Result<usize> {
        let missions = self.missions.list(&MissionFilter::default()).await?;
        let spawned: HashSet<&str> = missions
            .iter()
            .filter_map(|m| m.predecessor.as_deref())
            .collect();
        let mut armed = 0;
        for mission in &missions {
            if mission.status == MissionStatus::Aborted {
                continue;
            }
            if mission.status == MissionStatus::Completed && spawned.contains(mission.id.as_str()) {
                continue;
            }
            if self.register(mission) {
                armed += 1;
            }
        }
        tracing::info!("Restored {} recurrence timers", armed);
        Ok(armed)
    }

    /// Abort every timer.
    pub fn shutdown(&self) {
        let ids: Vec<String> = self.timers.iter().map(|r| r.key().clone()).collect();
        for id in ids {
            self.cancel(&id);
        }
    }

    fn disarm(&self, mission_id: &str, generation: u64) {
        self.timers
            .remove_if(mission_id, |_, timer| timer.generation == generation);
    }
}
