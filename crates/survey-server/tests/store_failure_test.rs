//! Store failure tests.
//!
//! Wrap the in-memory store so chosen writes fail once, then check that
//! every failed operation leaves drones and missions agreeing: a drone is
//! `in-mission` exactly while one live mission references it.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use survey_core::{
    CreateDroneRequest, CreateMissionRequest, Drone, DroneStatus, FlightParameters, Frequency,
    Mission, MissionAction, MissionStatus, Schedule, SurveyArea, SurveyPattern,
};
use survey_oracle::OracleAdapter;
use survey_server::config::Config;
use survey_server::error::CoordinationError;
use survey_server::persistence::{
    DroneFilter, DroneRepository, MemoryStore, MissionFilter, MissionRepository, Repositories,
};
use survey_server::state::AppState;

/// Drone store whose next write of an `available` drone fails.
struct FlakyDrones {
    inner: Arc<MemoryStore>,
    fail_release: AtomicBool,
}

#[async_trait]
impl DroneRepository for FlakyDrones {
    async fn get(&self, id: &str) -> Result<Option<Drone>> {
        DroneRepository::get(self.inner.as_ref(), id).await
    }

    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Drone>> {
        self.inner.find_by_serial(serial_number).await
    }

    async fn list(&self, filter: &DroneFilter) -> Result<Vec<Drone>> {
        DroneRepository::list(self.inner.as_ref(), filter).await
    }

    async fn save(&self, drone: &Drone) -> Result<()> {
        if drone.status == DroneStatus::Available && self.fail_release.swap(false, Ordering::SeqCst)
        {
            bail!("transient store failure");
        }
        DroneRepository::save(self.inner.as_ref(), drone).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        DroneRepository::delete(self.inner.as_ref(), id).await
    }
}

/// Mission store whose next save or delete fails.
struct FlakyMissions {
    inner: Arc<MemoryStore>,
    fail_save: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait]
impl MissionRepository for FlakyMissions {
    async fn get(&self, id: &str) -> Result<Option<Mission>> {
        MissionRepository::get(self.inner.as_ref(), id).await
    }

    async fn list(&self, filter: &MissionFilter) -> Result<Vec<Mission>> {
        MissionRepository::list(self.inner.as_ref(), filter).await
    }

    async fn save(&self, mission: &Mission) -> Result<()> {
        if self.fail_save.swap(false, Ordering::SeqCst) {
            bail!("transient store failure");
        }
        MissionRepository::save(self.inner.as_ref(), mission).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        if self.fail_delete.swap(false, Ordering::SeqCst) {
            bail!("transient store failure");
        }
        MissionRepository::delete(self.inner.as_ref(), id).await
    }
}

struct Harness {
    state: AppState,
    drones: Arc<FlakyDrones>,
    missions: Arc<FlakyMissions>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let drones = Arc::new(FlakyDrones {
        inner: store.clone(),
        fail_release: AtomicBool::new(false),
    });
    let missions = Arc::new(FlakyMissions {
        inner: store.clone(),
        fail_save: AtomicBool::new(false),
        fail_delete: AtomicBool::new(false),
    });
    let repos = Repositories {
        drones: drones.clone(),
        missions: missions.clone(),
        reports: store,
    };
    Harness {
        state: AppState::new(Config::default(), repos, OracleAdapter::disabled()),
        drones,
        missions,
    }
}

fn mission_request(drone: Option<&str>, frequency: Option<Frequency>) -> CreateMissionRequest {
    CreateMissionRequest {
        name: "Levee inspection".to_string(),
        survey_area: SurveyArea::from_ring(vec![
            [-121.50, 38.50],
            [-121.49, 38.50],
            [-121.49, 38.51],
            [-121.50, 38.50],
        ]),
        parameters: FlightParameters {
            altitude: 60.0,
            speed: 12.0,
            overlap: 70.0,
            pattern: SurveyPattern::Parallel,
        },
        schedule: Schedule {
            start_time: Utc::now(),
            end_time: None,
            is_recurring: frequency.is_some(),
            frequency,
        },
        assigned_drone: drone.map(str::to_string),
    }
}

async fn register_drone(state: &AppState, serial: &str) -> String {
    state
        .create_drone(CreateDroneRequest {
            name: format!("Drone {serial}"),
            serial_number: serial.to_string(),
            status: None,
            battery_level: Some(90.0),
            location: None,
            specifications: None,
        })
        .await
        .unwrap()
        .id
}

async fn assert_bindings_agree(state: &AppState) {
    let missions = state.list_missions(&MissionFilter::default()).await.unwrap();
    for drone in state.list_drones(&DroneFilter::default()).await.unwrap() {
        let live = missions
            .iter()
            .filter(|m| !m.status.is_terminal())
            .filter(|m| m.assigned_drone.as_deref() == Some(drone.id.as_str()))
            .count();
        assert!(live <= 1, "drone {} bound to {} live missions", drone.id, live);
        assert_eq!(
            drone.status == DroneStatus::InMission,
            live == 1,
            "drone {} is {} with {} live missions",
            drone.id,
            drone.status,
            live
        );
    }
}

fn is_internal(err: &CoordinationError) -> bool {
    matches!(err, CoordinationError::Internal(_))
}

/// A failed drone release leaves the mission running, and a retry finishes.
#[tokio::test]
async fn test_failed_release_keeps_mission_running() {
    let h = harness();
    let drone_id = register_drone(&h.state, "SN-1").await;
    let mission = h
        .state
        .create_mission(mission_request(Some(&drone_id), None))
        .await
        .unwrap();

    h.drones.fail_release.store(true, Ordering::SeqCst);
    let err = h.state.update_progress(&mission.id, 100.0).await.unwrap_err();
    assert!(is_internal(&err));

    assert_eq!(h.state.get_mission(&mission.id).await.unwrap(), mission);
    assert_eq!(
        h.state.get_drone(&drone_id).await.unwrap().status,
        DroneStatus::InMission
    );
    assert_bindings_agree(&h.state).await;

    let done = h.state.update_progress(&mission.id, 100.0).await.unwrap();
    assert_eq!(done.status, MissionStatus::Completed);
    assert_eq!(
        h.state.get_drone(&drone_id).await.unwrap().status,
        DroneStatus::Available
    );
    assert_bindings_agree(&h.state).await;
}

/// A failed completion write puts the drone back in its mission.
#[tokio::test]
async fn test_failed_completion_write_restores_drone() {
    let h = harness();
    let drone_id = register_drone(&h.state, "SN-2").await;
    let mission = h
        .state
        .create_mission(mission_request(Some(&drone_id), None))
        .await
        .unwrap();

    h.missions.fail_save.store(true, Ordering::SeqCst);
    let err = h.state.update_progress(&mission.id, 100.0).await.unwrap_err();
    assert!(is_internal(&err));

    assert_eq!(
        h.state.get_mission(&mission.id).await.unwrap().status,
        MissionStatus::InProgress
    );
    let drone = h.state.get_drone(&drone_id).await.unwrap();
    assert_eq!(drone.status, DroneStatus::InMission);
    assert_eq!(drone.last_mission.as_deref(), Some(mission.id.as_str()));
    assert_bindings_agree(&h.state).await;
}

/// A failed abort keeps the mission, its drone and its timer.
#[tokio::test]
async fn test_failed_abort_changes_nothing() {
    let h = harness();
    let drone_id = register_drone(&h.state, "SN-3").await;
    let mission = h
        .state
        .create_mission(mission_request(Some(&drone_id), Some(Frequency::Weekly)))
        .await
        .unwrap();

    h.drones.fail_release.store(true, Ordering::SeqCst);
    assert!(h
        .state
        .control_mission(&mission.id, MissionAction::Abort)
        .await
        .is_err());
    assert_eq!(h.state.get_mission(&mission.id).await.unwrap(), mission);
    assert!(h.state.scheduler().is_armed(&mission.id));
    assert_bindings_agree(&h.state).await;

    h.missions.fail_save.store(true, Ordering::SeqCst);
    assert!(h
        .state
        .control_mission(&mission.id, MissionAction::Abort)
        .await
        .is_err());
    assert_eq!(h.state.get_mission(&mission.id).await.unwrap(), mission);
    assert!(h.state.scheduler().is_armed(&mission.id));
    assert_bindings_agree(&h.state).await;

    let aborted = h
        .state
        .control_mission(&mission.id, MissionAction::Abort)
        .await
        .unwrap();
    assert_eq!(aborted.status, MissionStatus::Aborted);
    assert!(!h.state.scheduler().is_armed(&mission.id));
    assert_bindings_agree(&h.state).await;
}

/// A failed create leaves no mission and an available drone.
#[tokio::test]
async fn test_failed_create_rolls_back_reservation() {
    let h = harness();
    let drone_id = register_drone(&h.state, "SN-4").await;

    h.missions.fail_save.store(true, Ordering::SeqCst);
    let err = h
        .state
        .create_mission(mission_request(Some(&drone_id), Some(Frequency::Daily)))
        .await
        .unwrap_err();
    assert!(is_internal(&err));

    assert!(h
        .state
        .list_missions(&MissionFilter::default())
        .await
        .unwrap()
        .is_empty());
    let drone = h.state.get_drone(&drone_id).await.unwrap();
    assert_eq!(drone.status, DroneStatus::Available);
    assert_eq!(drone.last_mission, None);
    assert_eq!(h.state.scheduler().armed_count(), 0);
}

/// A failed delete keeps the mission bound to its drone and armed.
#[tokio::test]
async fn test_failed_delete_keeps_mission_bound() {
    let h = harness();
    let drone_id = register_drone(&h.state, "SN-5").await;
    let mission = h
        .state
        .create_mission(mission_request(Some(&drone_id), Some(Frequency::Monthly)))
        .await
        .unwrap();

    h.missions.fail_delete.store(true, Ordering::SeqCst);
    assert!(is_internal(
        &h.state.delete_mission(&mission.id).await.unwrap_err()
    ));
    assert_eq!(h.state.get_mission(&mission.id).await.unwrap(), mission);
    assert_eq!(
        h.state.get_drone(&drone_id).await.unwrap().status,
        DroneStatus::InMission
    );
    assert!(h.state.scheduler().is_armed(&mission.id));
    assert_bindings_agree(&h.state).await;

    h.drones.fail_release.store(true, Ordering::SeqCst);
    assert!(h.state.delete_mission(&mission.id).await.is_err());
    assert!(h.state.get_mission(&mission.id).await.is_ok());
    assert_bindings_agree(&h.state).await;

    h.state.delete_mission(&mission.id).await.unwrap();
    assert!(!h.state.scheduler().is_armed(&mission.id));
    assert_bindings_agree(&h.state).await;
}

/// A failed reassignment restores both the new and the old drone.
#[tokio::test]
async fn test_failed_reassign_restores_both_drones() {
    let h = harness();
    let first = register_drone(&h.state, "SN-6").await;
    let second = register_drone(&h.state, "SN-7").await;
    let mission = h
        .state
        .create_mission(mission_request(Some(&first), None))
        .await
        .unwrap();

    h.missions.fail_save.store(true, Ordering::SeqCst);
    assert!(h.state.reassign_drone(&mission.id, &second).await.is_err());
    assert_eq!(h.state.get_mission(&mission.id).await.unwrap(), mission);
    assert_eq!(
        h.state.get_drone(&first).await.unwrap().status,
        DroneStatus::InMission
    );
    let second_drone = h.state.get_drone(&second).await.unwrap();
    assert_eq!(second_drone.status, DroneStatus::Available);
    assert_eq!(second_drone.last_mission, None);
    assert_bindings_agree(&h.state).await;

    // Releasing the old drone fails after the new one was reserved.
    h.drones.fail_release.store(true, Ordering::SeqCst);
    assert!(h.state.reassign_drone(&mission.id, &second).await.is_err());
    assert_eq!(h.state.get_mission(&mission.id).await.unwrap(), mission);
    assert_eq!(
        h.state.get_drone(&second).await.unwrap().status,
        DroneStatus::Available
    );
    assert_bindings_agree(&h.state).await;

    let moved = h.state.reassign_drone(&mission.id, &second).await.unwrap();
    assert_eq!(moved.assigned_drone.as_deref(), Some(second.as_str()));
    assert_bindings_agree(&h.state).await;
}
