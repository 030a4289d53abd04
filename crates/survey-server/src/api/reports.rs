//! Report API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use survey_core::{GenerateReportRequest, Report};

use crate::api::body;
use crate::error::CoordinationError;
use crate::persistence::ReportFilter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsQuery {
    pub mission_id: Option<String>,
}

pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Report>), CoordinationError> {
    let report = state.generate_report(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<Vec<Report>>, CoordinationError> {
    let filter = ReportFilter {
        mission_id: query.mission_id,
    };
    Ok(Json(state.list_reports(&filter).await?))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Report>, CoordinationError> {
    Ok(Json(state.get_report(&id).await?))
}

pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, CoordinationError> {
    state.delete_report(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
