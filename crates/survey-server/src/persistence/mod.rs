//! Persistence layer for the survey server.
//!
//! One repository trait per entity. `MemoryStore` keeps records in DashMaps;
//! `SqliteStore` keeps the filterable columns next to a JSON document.

pub mod db;
pub mod drones;
pub mod memory;
pub mod missions;
pub mod reports;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use survey_core::{Drone, DroneStatus, Mission, MissionStatus, Report};

pub use db::{init_database, Database, SqliteStore};
pub use memory::MemoryStore;

#[derive(Debug, Clone, Default)]
pub struct DroneFilter {
    pub status: Option<DroneStatus>,
}

impl DroneFilter {
    pub fn matches(&self, drone: &Drone) -> bool {
        self.status.map_or(true, |status| drone.status == status)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MissionFilter {
    pub status: Option<MissionStatus>,
    pub assigned_drone: Option<String>,
}

impl MissionFilter {
    pub fn matches(&self, mission: &Mission) -> bool {
        self.status.map_or(true, |status| mission.status == status)
            && self
                .assigned_drone
                .as_deref()
                .map_or(true, |drone| mission.assigned_drone.as_deref() == Some(drone))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub mission_id: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        self.mission_id
            .as_deref()
            .map_or(true, |mission| report.mission_id == mission)
    }
}

#[async_trait]
pub trait DroneRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Drone>>;
    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Drone>>;
    async fn list(&self, filter: &DroneFilter) -> Result<Vec<Drone>>;
    /// Insert or replace.
    async fn save(&self, drone: &Drone) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait MissionRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Mission>>;
    /// Oldest first.
    async fn list(&self, filter: &MissionFilter) -> Result<Vec<Mission>>;
    async fn save(&self, mission: &Mission) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Report>>;
    /// Newest first.
    async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>>;
    async fn save(&self, report: &Report) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// The three repositories the coordination layer works against.
#[derive(Clone)]
pub struct Repositories {
    pub drones: Arc<dyn DroneRepository>,
    pub missions: Arc<dyn MissionRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    pub fn sqlite(database: Database) -> Self {
        Self::from_store(Arc::new(SqliteStore::new(database)))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: DroneRepository + MissionRepository + ReportRepository + 'static,
    {
        Self {
            drones: store.clone(),
            missions: store.clone(),
            reports: store,
        }
    }
}
