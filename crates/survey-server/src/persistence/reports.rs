//! Report persistence operations.

use anyhow::Result;
use async_trait::async_trait;
use survey_core::Report;

use super::db::{timestamp, DocumentRow, SqliteStore};
use super::{ReportFilter, ReportRepository};

#[async_trait]
impl ReportRepository for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Report>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT document FROM reports WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| r.decode()).transpose()
    }

    async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT document FROM reports WHERE (?1 IS NULL OR mission_id = ?1) ORDER BY generated_at DESC",
        )
        .bind(filter.mission_id.as_deref())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(DocumentRow::decode).collect()
    }

    async fn save(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, mission_id, generated_at, document)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                mission_id = ?2, generated_at = ?3, document = ?4
            "#,
        )
        .bind(&report.id)
        .bind(&report.mission_id)
        .bind(timestamp(report.generated_at))
        .bind(serde_json::to_string(report)?)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
