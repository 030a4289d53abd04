//! Mission status transitions, progress and ETA decay.
//!
//! ```text
//! planned ──▶ in-progress ──▶ completed
//!               │    ▲
//!         pause ▼    │ resume
//!              paused
//! planned | in-progress | paused ──abort──▶ aborted
//! ```
//!
//! These rules are pure; locking, persistence and drone release live in the
//! server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InvalidTransition, ValidationError};
use crate::models::{CreateMissionRequest, Mission, MissionStatus};
use crate::spatial::estimate_eta_minutes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionAction {
    Pause,
    Resume,
    Abort,
}

impl fmt::Display for MissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Abort => "abort",
        })
    }
}

impl MissionStatus {
    /// Target status for a control action, or `None` when illegal.
    pub fn after(self, action: MissionAction) -> Option<MissionStatus> {
        use MissionStatus::*;
        match (self, action) {
            (InProgress, MissionAction::Pause) => Some(Paused),
            (Paused, MissionAction::Resume) => Some(InProgress),
            (Planned | InProgress | Paused, MissionAction::Abort) => Some(Aborted),
            _ => None,
        }
    }
}

/// Reject progress outside `0..=100`.
pub fn validate_progress(progress: f64) -> Result<(), ValidationError> {
    if progress.is_finite() && (0.0..=100.0).contains(&progress) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange(progress))
    }
}

impl Mission {
    /// Build a new mission from a validated request and the path it will fly.
    ///
    /// A bound drone starts the mission `in-progress`; otherwise it is
    /// `planned`.
    pub fn from_request(
        id: String,
        request: CreateMissionRequest,
        flight_path: &[[f64; 2]],
        now: DateTime<Utc>,
    ) -> Self {
        let status = if request.assigned_drone.is_some() {
            MissionStatus::InProgress
        } else {
            MissionStatus::Planned
        };
        let eta = estimate_eta_minutes(flight_path, request.parameters.speed);
        let mut survey_area = request.survey_area;
        survey_area.coordinates = vec![flight_path.to_vec()];
        Self {
            id,
            name: request.name,
            status,
            survey_area,
            parameters: request.parameters,
            assigned_drone: request.assigned_drone,
            schedule: request.schedule,
            progress: 0.0,
            eta,
            created_at: now,
            updated_at: now,
            predecessor: None,
        }
    }

    /// Apply a progress report. Returns `true` when this call completed the
    /// mission, in which case the caller must release the assigned drone.
    ///
    /// The ETA decays from its previous value on every call; it is not
    /// recomputed from the remaining distance.
    pub fn record_progress(
        &mut self,
        progress: f64,
        now: DateTime<Utc>,
    ) -> Result<bool, InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition::new(self.status, "update progress of"));
        }

        self.progress = progress;
        self.eta = (self.eta * (100.0 - progress) / 100.0).max(0.0);
        self.updated_at = now;

        if progress >= 100.0 {
            self.status = MissionStatus::Completed;
            self.eta = 0.0;
            return Ok(true);
        }
        if progress > 0.0 && self.status == MissionStatus::Planned {
            self.status = MissionStatus::InProgress;
        }
        Ok(false)
    }

    /// Apply a control action. Illegal actions leave the mission untouched.
    pub fn control(
        &mut self,
        action: MissionAction,
        now: DateTime<Utc>,
    ) -> Result<MissionStatus, InvalidTransition> {
        let next = self
            .status
            .after(action)
            .ok_or_else(|| InvalidTransition::new(self.status, action.to_string()))?;
        self.status = next;
        self.updated_at = now;
        Ok(next)
    }

    /// Recompute the ETA from the current ring and speed, scaled by the
    /// remaining progress.
    pub fn refresh_eta(&mut self) {
        let full = estimate_eta_minutes(self.survey_area.ring(), self.parameters.speed);
        self.eta = full * (100.0 - self.progress) / 100.0;
    }

    /// Fresh copy of this mission's plan for the next recurrence.
    pub fn successor(&self, id: String, now: DateTime<Utc>) -> Mission {
        Mission {
            id,
            name: self.name.clone(),
            status: MissionStatus::Planned,
            survey_area: self.survey_area.clone(),
            parameters: self.parameters,
            assigned_drone: None,
            schedule: self.schedule.clone(),
            progress: 0.0,
            eta: estimate_eta_minutes(self.survey_area.ring(), self.parameters.speed),
            created_at: now,
            updated_at: now,
            predecessor: Some(self.id.clone()),
        }
    }
}
