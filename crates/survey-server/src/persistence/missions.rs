//! Mission persistence operations.

use anyhow::Result;
use async_trait::async_trait;
use survey_core::Mission;

use super::db::{timestamp, DocumentRow, SqliteStore};
use super::{MissionFilter, MissionRepository};

#[async_trait]
impl MissionRepository for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Mission>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT document FROM missions WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| r.decode()).transpose()
    }

    async fn list(&self, filter: &MissionFilter) -> Result<Vec<Mission>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT document FROM missions
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR assigned_drone = ?2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.assigned_drone.as_deref())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(DocumentRow::decode).collect()
    }

    async fn save(&self, mission: &Mission) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO missions (id, status, assigned_drone, created_at, updated_at, document)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                status = ?2, assigned_drone = ?3, updated_at = ?5, document = ?6
            "#,
        )
        .bind(&mission.id)
        .bind(mission.status.as_str())
        .bind(mission.assigned_drone.as_deref())
        .bind(timestamp(mission.created_at))
        .bind(timestamp(mission.updated_at))
        .bind(serde_json::to_string(mission)?)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM missions WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
