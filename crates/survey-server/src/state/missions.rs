//! Mission lifecycle operations.
//!
//! Every read-modify-write runs under the mission's lock; drone locks are
//! taken after it through the ledger. No lock is held across an oracle call.
//!
//! Drone records change before the mission record that justifies them and
//! stay locked until that write lands. A failed mission write restores them,
//! so a drone is `in-mission` exactly while a live mission references it.
//! A reassignment locks the new drone before the old one; the new drone is
//! only held while it is available, so no other mission can be releasing it.

use chrono::Utc;
use survey_core::{
    validate_progress, CreateMissionRequest, DroneStatus, InvalidTransition, Mission,
    MissionAction, MissionStatus, MissionStatusStats, UpdateMissionRequest, ValidationError,
};
use uuid::Uuid;

use super::AppState;
use crate::error::CoordinationError;
use crate::ledger::Reservation;
use crate::persistence::MissionFilter;

impl AppState {
    pub async fn list_missions(
        &self,
        filter: &MissionFilter,
    ) -> Result<Vec<Mission>, CoordinationError> {
        Ok(self.repos.missions.list(filter).await?)
    }

    pub async fn get_mission(&self, id: &str) -> Result<Mission, CoordinationError> {
        self.repos
            .missions
            .get(id)
            .await?
            .ok_or_else(|| CoordinationError::mission_not_found(id))
    }

    /// Validate, optimize the path, bind the drone and persist.
    ///
    /// The drone stays locked from reservation until the mission is written;
    /// a failed write rolls the drone back.
    pub async fn create_mission(
        &self,
        req: CreateMissionRequest,
    ) -> Result<Mission, CoordinationError> {
        req.validate()?;

        // Fail fast before paying for an oracle call. The authoritative
        // check happens again under the drone lock.
        if let Some(drone_id) = req.assigned_drone.as_deref() {
            let drone = self.get_drone(drone_id).await?;
            if drone.status != DroneStatus::Available {
                return Err(CoordinationError::DroneUnavailable {
                    drone_id: drone.id,
                    status: drone.status,
                });
            }
        }

        let flight_path = self
            .oracle
            .optimize_path(&req.survey_area, &req.parameters)
            .await;

        let id = Uuid::new_v4().to_string();
        let mut held = Vec::new();
        if let Some(drone_id) = req.assigned_drone.as_deref() {
            held.push(self.ledger.begin(drone_id, &id).await?);
        }

        let mission = Mission::from_request(id, req, &flight_path, Utc::now());
        self.persist_reserved(&mission, held).await?;

        self.scheduler.register(&mission);
        tracing::info!(
            "Created mission '{}' ({}) status={} eta={:.1}min",
            mission.name,
            mission.id,
            mission.status,
            mission.eta
        );
        Ok(mission)
    }

    /// Record progress. Reaching 100 completes the mission and frees its
    /// drone.
    pub async fn update_progress(
        &self,
        id: &str,
        progress: f64,
    ) -> Result<Mission, CoordinationError> {
        validate_progress(progress)?;
        let _guard = self.mission_locks.lock(id).await;

        let mut mission = self.get_mission(id).await?;
        let completed = mission.record_progress(progress, Utc::now())?;

        let mut held = Vec::new();
        if completed {
            if let Some(drone_id) = mission.assigned_drone.as_deref() {
                held.extend(self.ledger.begin_release(drone_id).await?);
            }
        }
        self.persist_reserved(&mission, held).await?;

        if completed {
            tracing::info!("Mission {} completed", mission.id);
        }
        Ok(mission)
    }

    /// Pause, resume or abort. Abort frees the drone and disarms recurrence.
    pub async fn control_mission(
        &self,
        id: &str,
        action: MissionAction,
    ) -> Result<Mission, CoordinationError> {
        let _guard = self.mission_locks.lock(id).await;

        let mut mission = self.get_mission(id).await?;
        let previous = mission.status;
        let status = mission.control(action, Utc::now())?;

        let mut held = Vec::new();
        if status == MissionStatus::Aborted {
            if let Some(drone_id) = mission.assigned_drone.as_deref() {
                held.extend(self.ledger.begin_release(drone_id).await?);
            }
        }
        self.persist_reserved(&mission, held).await?;
        tracing::info!("Mission {} {} -> {}", mission.id, previous, status);

        if status == MissionStatus::Aborted {
            self.scheduler.cancel(&mission.id);
        }
        Ok(mission)
    }

    /// Bind a different drone. The new drone is reserved and the old one
    /// released before the mission is written; a failed write undoes both.
    pub async fn reassign_drone(
        &self,
        id: &str,
        drone_id: &str,
    ) -> Result<Mission, CoordinationError> {
        self.update_mission(
            id,
            UpdateMissionRequest {
                assigned_drone: Some(drone_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Merge a partial update into a non-terminal mission.
    pub async fn update_mission(
        &self,
        id: &str,
        req: UpdateMissionRequest,
    ) -> Result<Mission, CoordinationError> {
        if let Some(progress) = req.progress {
            validate_progress(progress)?;
        }
        let _guard = self.mission_locks.lock(id).await;

        let original = self.get_mission(id).await?;
        if original.status.is_terminal() {
            return Err(InvalidTransition::new(original.status, "update").into());
        }

        let mut mission = original.clone();
        let now = Utc::now();

        if let Some(name) = req.name {
            if name.trim().is_empty() {
                return Err(ValidationError::invalid("name", "name must not be empty").into());
            }
            mission.name = name;
        }
        if let Some(area) = req.survey_area {
            area.validate()?;
            mission.survey_area = area;
        }
        if let Some(patch) = req.parameters.as_ref() {
            let parameters = mission.parameters.merge(patch);
            parameters.validate()?;
            mission.parameters = parameters;
        }
        if let Some(patch) = req.schedule.as_ref() {
            let schedule = mission.schedule.merge(patch);
            schedule.validate()?;
            mission.schedule = schedule;
        }
        if mission.survey_area != original.survey_area
            || mission.parameters.speed != original.parameters.speed
        {
            mission.refresh_eta();
        }

        let mut completed = false;
        if let Some(progress) = req.progress {
            completed = mission.record_progress(progress, now)?;
        }
        mission.updated_at = now;

        let new_drone = req
            .assigned_drone
            .filter(|drone| original.assigned_drone.as_deref() != Some(drone.as_str()));
        let mut held = Vec::new();
        if let Some(drone_id) = new_drone.as_deref() {
            let mut reservation = self.ledger.begin(drone_id, &mission.id).await?;
            if completed {
                if let Err(err) = reservation.set_available().await {
                    self.unwind(&mission.id, vec![reservation]).await;
                    return Err(err);
                }
            }
            held.push(reservation);
            mission.assigned_drone = Some(drone_id.to_string());
            if mission.status == MissionStatus::Planned {
                mission.status = MissionStatus::InProgress;
            }
        }

        let mut releases = Vec::new();
        if new_drone.is_some() {
            releases.extend(original.assigned_drone.as_deref());
        } else if completed {
            releases.extend(mission.assigned_drone.as_deref());
        }
        for drone_id in releases {
            match self.ledger.begin_release(drone_id).await {
                Ok(release) => held.extend(release),
                Err(err) => {
                    self.unwind(&mission.id, held).await;
                    return Err(err);
                }
            }
        }

        self.persist_reserved(&mission, held).await?;

        if new_drone.is_some() {
            tracing::info!(
                "Mission {} reassigned {} -> {}",
                mission.id,
                original.assigned_drone.as_deref().unwrap_or("-"),
                mission.assigned_drone.as_deref().unwrap_or("-")
            );
        }
        if mission.schedule != original.schedule {
            self.scheduler.cancel(&mission.id);
            self.scheduler.register(&mission);
        }
        Ok(mission)
    }

    /// Remove a mission, freeing its drone if it still holds one.
    pub async fn delete_mission(&self, id: &str) -> Result<(), CoordinationError> {
        let _guard = self.mission_locks.lock(id).await;
        let mission = self.get_mission(id).await?;

        let mut held = Vec::new();
        if !mission.status.is_terminal() {
            if let Some(drone_id) = mission.assigned_drone.as_deref() {
                held.extend(self.ledger.begin_release(drone_id).await?);
            }
        }
        let deleted = self.repos.missions.delete(id).await.map(drop);
        self.settle(id, held, deleted).await?;

        self.scheduler.cancel(id);
        tracing::info!("Deleted mission {}", id);
        Ok(())
    }

    /// Per-status aggregates, in status order, for statuses that occur.
    pub async fn mission_stats(&self) -> Result<Vec<MissionStatusStats>, CoordinationError> {
        let missions = self.repos.missions.list(&MissionFilter::default()).await?;
        let stats = MissionStatus::ALL
            .into_iter()
            .filter_map(|status| {
                let group: Vec<&Mission> =
                    missions.iter().filter(|m| m.status == status).collect();
                if group.is_empty() {
                    return None;
                }
                let count = group.len() as f64;
                Some(MissionStatusStats {
                    status,
                    count: group.len(),
                    avg_progress: group.iter().map(|m| m.progress).sum::<f64>() / count,
                    avg_eta: group.iter().map(|m| m.eta).sum::<f64>() / count,
                })
            })
            .collect();
        Ok(stats)
    }

    /// Write the mission, then either keep the held drone records or undo
    /// them.
    async fn persist_reserved(
        &self,
        mission: &Mission,
        held: Vec<Reservation<'_>>,
    ) -> Result<(), CoordinationError> {
        let saved = self.repos.missions.save(mission).await;
        self.settle(&mission.id, held, saved).await
    }

    async fn settle(
        &self,
        mission_id: &str,
        held: Vec<Reservation<'_>>,
        written: anyhow::Result<()>,
    ) -> Result<(), CoordinationError> {
        match written {
            Ok(()) => {
                for reservation in held {
                    reservation.commit();
                }
                Ok(())
            }
            Err(err) => {
                self.unwind(mission_id, held).await;
                Err(err.into())
            }
        }
    }

    /// Restore held drones, newest first.
    async fn unwind(&self, mission_id: &str, held: Vec<Reservation<'_>>) {
        for reservation in held.into_iter().rev() {
            let drone_id = reservation.drone().id.clone();
            if let Err(err) = reservation.rollback().await {
                tracing::error!(
                    "Failed to restore drone {} for mission {}: {:#}",
                    drone_id,
                    mission_id,
                    err
                );
            }
        }
    }
}
