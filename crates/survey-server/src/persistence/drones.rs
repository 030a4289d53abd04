//! Drone persistence operations.

use anyhow::Result;
use async_trait::async_trait;
use survey_core::Drone;

use super::db::{timestamp, DocumentRow, SqliteStore};
use super::{DroneFilter, DroneRepository};

#[async_trait]
impl DroneRepository for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Drone>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT document FROM drones WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| r.decode()).transpose()
    }

    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Drone>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT document FROM drones WHERE serial_number = ?1",
        )
        .bind(serial_number)
        .fetch_optional(self.pool())
        .await?;
        row.map(|r| r.decode()).transpose()
    }

    async fn list(&self, filter: &DroneFilter) -> Result<Vec<Drone>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT document FROM drones WHERE (?1 IS NULL OR status = ?1) ORDER BY last_seen DESC",
        )
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(DocumentRow::decode).collect()
    }

    async fn save(&self, drone: &Drone) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO drones (id, serial_number, status, last_seen, document)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                serial_number = ?2, status = ?3, last_seen = ?4, document = ?5
            "#,
        )
        .bind(&drone.id)
        .bind(&drone.serial_number)
        .bind(drone.status.as_str())
        .bind(timestamp(drone.last_seen))
        .bind(serde_json::to_string(drone)?)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM drones WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use chrono::Utc;
    use survey_core::{DroneStatus, GeoPoint};

    fn drone(id: &str, serial: &str, status: DroneStatus) -> Drone {
        Drone {
            id: id.to_string(),
            name: format!("Drone {id}"),
            serial_number: serial.to_string(),
            status,
            battery_level: 90.0,
            location: GeoPoint::new(-117.8, 33.6),
            specifications: Default::default(),
            maintenance_history: Vec::new(),
            last_mission: None,
            last_seen: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_filter_and_delete() {
        let store = SqliteStore::new(init_database(":memory:", 1).await.unwrap());
        store.save(&drone("d-1", "SN-1", DroneStatus::Available)).await.unwrap();
        store.save(&drone("d-2", "SN-2", DroneStatus::Charging)).await.unwrap();

        let mut updated = drone("d-1", "SN-1", DroneStatus::InMission);
        updated.last_mission = Some("m-1".to_string());
        store.save(&updated).await.unwrap();

        let in_mission = store
            .list(&DroneFilter {
                status: Some(DroneStatus::InMission),
            })
            .await
            .unwrap();
        assert_eq!(in_mission.len(), 1);
        assert_eq!(in_mission[0].last_mission.as_deref(), Some("m-1"));

        let by_serial = store.find_by_serial("SN-2").await.unwrap().unwrap();
        assert_eq!(by_serial.id, "d-2");

        assert!(store.delete("d-2").await.unwrap());
        assert!(!store.delete("d-2").await.unwrap());
        assert!(DroneRepository::get(&store, "d-2").await.unwrap().is_none());
    }
}
