//! Survey report generation.

use chrono::Utc;
use serde_json::Value;
use survey_core::{FlightStats, GenerateReportRequest, Report};
use uuid::Uuid;

use super::AppState;
use crate::error::CoordinationError;
use crate::persistence::ReportFilter;

impl AppState {
    /// Analyze the images, summarize the mission and store the report.
    /// Oracle failures degrade to placeholder analysis and a fixed summary.
    pub async fn generate_report(
        &self,
        req: GenerateReportRequest,
    ) -> Result<Report, CoordinationError> {
        req.validate()?;
        let mission = self.get_mission(&req.mission_id).await?;

        let analysis = self.oracle.analyze_images(&req.images).await;
        let summary = self.oracle.summarize(&mission, &analysis).await;

        let report = Report {
            id: Uuid::new_v4().to_string(),
            mission_id: mission.id.clone(),
            generated_at: Utc::now(),
            summary,
            flight_stats: FlightStats::from_mission(&mission),
            analysis: Value::Array(analysis),
        };
        self.repos.reports.save(&report).await?;

        tracing::info!(
            "Generated report {} for mission {} ({} images)",
            report.id,
            mission.id,
            req.images.len()
        );
        Ok(report)
    }

    pub async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, CoordinationError> {
        Ok(self.repos.reports.list(filter).await?)
    }

    pub async fn get_report(&self, id: &str) -> Result<Report, CoordinationError> {
        self.repos
            .reports
            .get(id)
            .await?
            .ok_or_else(|| CoordinationError::report_not_found(id))
    }

    pub async fn delete_report(&self, id: &str) -> Result<(), CoordinationError> {
        if !self.repos.reports.delete(id).await? {
            return Err(CoordinationError::report_not_found(id));
        }
        tracing::info!("Deleted report {}", id);
        Ok(())
    }
}
