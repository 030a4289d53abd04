//! Drone allocation ledger.
//!
//! A drone enters or leaves `in-mission` only here, and only while its lock
//! is held, so two missions can never bind the same drone. The lock stays
//! held until the mission write that goes with the change is settled.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use survey_core::{Drone, DroneStatus};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::CoordinationError;
use crate::persistence::DroneRepository;

/// Per-id async mutexes, created on first use and dropped with the last
/// guard.
#[derive(Default)]
pub struct LockTable {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: &str) -> LockGuard<'_> {
        let mutex = self.locks.entry(id.to_string()).or_default().clone();
        LockGuard {
            table: self,
            id: id.to_string(),
            inner: Some(mutex.lock_owned().await),
        }
    }

    /// Drop the entry for `id` unless someone is holding or waiting on it.
    fn forget(&self, id: &str) {
        self.locks.remove_if(id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock on one id. Unlocking removes the table entry once nobody else
/// is queued on it.
pub struct LockGuard<'a> {
    table: &'a LockTable,
    id: String,
    inner: Option<OwnedMutexGuard<()>>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.inner.take();
        self.table.forget(&self.id);
    }
}

pub struct Ledger {
    drones: Arc<dyn DroneRepository>,
    locks: LockTable,
}

impl Ledger {
    pub fn new(drones: Arc<dyn DroneRepository>) -> Self {
        Self {
            drones,
            locks: LockTable::new(),
        }
    }

    /// Lock a drone for a read-modify-write outside the ledger.
    pub async fn lock(&self, drone_id: &str) -> LockGuard<'_> {
        self.locks.lock(drone_id).await
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Bind `drone_id` to `mission_id` and keep the drone locked until the
    /// reservation is committed or rolled back.
    pub async fn begin(
        &self,
        drone_id: &str,
        mission_id: &str,
    ) -> Result<Reservation<'_>, CoordinationError> {
        let guard = self.locks.lock(drone_id).await;

        let previous = self
            .drones
            .get(drone_id)
            .await?
            .ok_or_else(|| CoordinationError::drone_not_found(drone_id))?;
        if previous.status != DroneStatus::Available {
            return Err(CoordinationError::DroneUnavailable {
                drone_id: drone_id.to_string(),
                status: previous.status,
            });
        }

        let mut drone = previous.clone();
        drone.status = DroneStatus::InMission;
        drone.last_mission = Some(mission_id.to_string());
        drone.last_seen = Utc::now();
        self.drones.save(&drone).await?;

        tracing::info!("Reserved drone {} for mission {}", drone_id, mission_id);
        Ok(Reservation {
            ledger: self,
            previous,
            drone,
            _guard: guard,
        })
    }

    /// Return a drone to the pool and keep it locked until the mission write
    /// that justifies the release has landed. A drone that no longer exists
    /// is skipped.
    pub async fn begin_release(
        &self,
        drone_id: &str,
    ) -> Result<Option<Reservation<'_>>, CoordinationError> {
        let guard = self.locks.lock(drone_id).await;

        let Some(previous) = self.drones.get(drone_id).await? else {
            tracing::warn!("Release skipped: drone {} no longer exists", drone_id);
            return Ok(None);
        };
        let mut drone = previous.clone();
        drone.status = DroneStatus::Available;
        drone.last_seen = Utc::now();
        self.drones.save(&drone).await?;

        tracing::info!("Released drone {}", drone_id);
        Ok(Some(Reservation {
            ledger: self,
            previous,
            drone,
            _guard: guard,
        }))
    }
}

/// A drone record written ahead of its mission, held locked until the
/// mission write either lands or fails.
pub struct Reservation<'a> {
    ledger: &'a Ledger,
    previous: Drone,
    drone: Drone,
    _guard: LockGuard<'a>,
}

impl Reservation<'_> {
    pub fn drone(&self) -> &Drone {
        &self.drone
    }

    /// Free a just-reserved drone again, for a mission that finishes in the
    /// same write that bound it. Rollback still restores the record from
    /// before `begin`.
    pub async fn set_available(&mut self) -> Result<(), CoordinationError> {
        let mut drone = self.drone.clone();
        drone.status = DroneStatus::Available;
        drone.last_seen = Utc::now();
        self.ledger.drones.save(&drone).await?;
        self.drone = drone;
        Ok(())
    }

    /// Keep the written record and unlock the drone.
    pub fn commit(self) -> Drone {
        self.drone
    }

    /// Restore the drone record from before the reservation.
    pub async fn rollback(self) -> anyhow::Result<()> {
        self.ledger.drones.save(&self.previous).await?;
        tracing::warn!(
            "Restored drone {} to {} after a failed mission write",
            self.previous.id,
            self.previous.status
        );
        Ok(())
    }
}
