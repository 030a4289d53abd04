//! In-memory repositories using DashMap.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use survey_core::{Drone, Mission, Report};

use super::{
    DroneFilter, DroneRepository, MissionFilter, MissionRepository, ReportFilter,
    ReportRepository,
};

/// Process-local store. Used when no database path is configured, and in
/// tests.
#[derive(Default)]
pub struct MemoryStore {
    drones: DashMap<String, Drone>,
    missions: DashMap<String, Mission>,
    reports: DashMap<String, Report>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DroneRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Drone>> {
        Ok(self.drones.get(id).map(|r| r.value().clone()))
    }

    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Drone>> {
        Ok(self
            .drones
            .iter()
            .find(|r| r.serial_number == serial_number)
            .map(|r| r.value().clone()))
    }

    async fn list(&self, filter: &DroneFilter) -> Result<Vec<Drone>> {
        let mut drones: Vec<Drone> = self
            .drones
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        drones.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(drones)
    }

    async fn save(&self, drone: &Drone) -> Result<()> {
        self.drones.insert(drone.id.clone(), drone.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.drones.remove(id).is_some())
    }
}

#[async_trait]
impl MissionRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Mission>> {
        Ok(self.missions.get(id).map(|r| r.value().clone()))
    }

    async fn list(&self, filter: &MissionFilter) -> Result<Vec<Mission>> {
        let mut missions: Vec<Mission> = self
            .missions
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        missions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(missions)
    }

    async fn save(&self, mission: &Mission) -> Result<()> {
        self.missions.insert(mission.id.clone(), mission.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.missions.remove(id).is_some())
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Report>> {
        Ok(self.reports.get(id).map(|r| r.value().clone()))
    }

    async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(reports)
    }

    async fn save(&self, report: &Report) -> Result<()> {
        self.reports.insert(report.id.clone(), report.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.reports.remove(id).is_some())
    }
}
