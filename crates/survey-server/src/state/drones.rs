//! Drone registry operations.

use chrono::Utc;
use survey_core::{
    CreateDroneRequest, Drone, DroneStatus, DroneStatusStats, GeoPoint, MaintenanceRecord,
    UpdateDroneRequest, ValidationError,
};
use uuid::Uuid;

use super::AppState;
use crate::error::CoordinationError;
use crate::persistence::DroneFilter;

fn reject_in_mission(status: Option<DroneStatus>) -> Result<(), ValidationError> {
    if status == Some(DroneStatus::InMission) {
        return Err(ValidationError::invalid(
            "status",
            "in-mission is set by assigning the drone to a mission",
        ));
    }
    Ok(())
}

impl AppState {
    pub async fn list_drones(&self, filter: &DroneFilter) -> Result<Vec<Drone>, CoordinationError> {
        Ok(self.repos.drones.list(filter).await?)
    }

    pub async fn get_drone(&self, id: &str) -> Result<Drone, CoordinationError> {
        self.repos
            .drones
            .get(id)
            .await?
            .ok_or_else(|| CoordinationError::drone_not_found(id))
    }

    pub async fn create_drone(&self, req: CreateDroneRequest) -> Result<Drone, CoordinationError> {
        req.validate()?;
        reject_in_mission(req.status)?;

        let _registry = self.registry.lock().await;
        if self
            .repos
            .drones
            .find_by_serial(&req.serial_number)
            .await?
            .is_some()
        {
            return Err(CoordinationError::DuplicateSerial(req.serial_number));
        }

        let drone = Drone {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            serial_number: req.serial_number,
            status: req.status.unwrap_or_default(),
            battery_level: req.battery_level.unwrap_or(100.0),
            location: req.location.unwrap_or_default(),
            specifications: req.specifications.unwrap_or_default(),
            maintenance_history: Vec::new(),
            last_mission: None,
            last_seen: Utc::now(),
        };
        self.repos.drones.save(&drone).await?;

        tracing::info!("Registered drone '{}' ({})", drone.name, drone.id);
        Ok(drone)
    }

    /// Partial update. Status changes follow the same rules as
    /// [`AppState::set_drone_status`].
    pub async fn update_drone(
        &self,
        id: &str,
        req: UpdateDroneRequest,
    ) -> Result<Drone, CoordinationError> {
        req.validate()?;
        reject_in_mission(req.status)?;

        let _registry = match req.serial_number {
            Some(_) => Some(self.registry.lock().await),
            None => None,
        };
        let _guard = self.ledger.lock(id).await;

        let mut drone = self.get_drone(id).await?;
        let now = Utc::now();
        let mut seen = false;

        if let Some(serial) = req.serial_number {
            if serial != drone.serial_number {
                if let Some(other) = self.repos.drones.find_by_serial(&serial).await? {
                    if other.id != drone.id {
                        return Err(CoordinationError::DuplicateSerial(serial));
                    }
                }
                drone.serial_number = serial;
            }
        }

        if let Some(status) = req.status {
            if status != drone.status {
                if drone.status == DroneStatus::InMission {
                    return Err(CoordinationError::DroneBusy(drone.id));
                }
                if status == DroneStatus::Maintenance {
                    drone.maintenance_history.push(MaintenanceRecord {
                        date: now,
                        kind: "status-change".to_string(),
                        description: format!("Entered maintenance from {}", drone.status),
                    });
                }
                tracing::info!("Drone {} status {} -> {}", drone.id, drone.status, status);
                drone.status = status;
            }
            seen = true;
        }

        if let Some(location) = req.location {
            drone.location = location;
            seen = true;
        }
        if let Some(name) = req.name {
            drone.name = name;
        }
        if let Some(level) = req.battery_level {
            drone.battery_level = level;
        }
        if let Some(specifications) = req.specifications {
            drone.specifications = specifications;
        }
        if seen {
            drone.last_seen = now;
        }

        self.repos.drones.save(&drone).await?;
        Ok(drone)
    }

    pub async fn set_drone_status(
        &self,
        id: &str,
        status: DroneStatus,
    ) -> Result<Drone, CoordinationError> {
        self.update_drone(
            id,
            UpdateDroneRequest {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_drone_location(
        &self,
        id: &str,
        coordinates: [f64; 2],
    ) -> Result<Drone, CoordinationError> {
        self.update_drone(
            id,
            UpdateDroneRequest {
                location: Some(GeoPoint::new(coordinates[0], coordinates[1])),
                ..Default::default()
            },
        )
        .await
    }

    /// Remove a drone. A drone bound to a mission cannot be removed.
    pub async fn delete_drone(&self, id: &str) -> Result<(), CoordinationError> {
        let _guard = self.ledger.lock(id).await;
        let drone = self.get_drone(id).await?;
        if drone.status == DroneStatus::InMission {
            return Err(CoordinationError::DroneBusy(drone.id));
        }
        self.repos.drones.delete(id).await?;
        tracing::info!("Deleted drone {}", id);
        Ok(())
    }

    /// Per-status aggregates, in status order, for statuses that occur.
    pub async fn drone_stats(&self) -> Result<Vec<DroneStatusStats>, CoordinationError> {
        let drones = self.repos.drones.list(&DroneFilter::default()).await?;
        let stats = DroneStatus::ALL
            .into_iter()
            .filter_map(|status| {
                let group: Vec<&Drone> = drones.iter().filter(|d| d.status == status).collect();
                if group.is_empty() {
                    return None;
                }
                let total: f64 = group.iter().map(|d| d.battery_level).sum();
                Some(DroneStatusStats {
                    status,
                    count: group.len(),
                    avg_battery: total / group.len() as f64,
                    most_recent_update: group.iter().map(|d| d.last_seen).max(),
                })
            })
            .collect();
        Ok(stats)
    }
}
