//! Mission API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use survey_core::{
    CreateMissionRequest, Mission, MissionAction, MissionStatus, MissionStatusStats,
    UpdateMissionRequest, ValidationError,
};

use crate::api::body;
use crate::error::CoordinationError;
use crate::persistence::MissionFilter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMissionsQuery {
    pub status: Option<String>,
    pub assigned_drone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressBody {
    pub progress: f64,
}

#[derive(Debug, Deserialize)]
pub struct ControlBody {
    pub action: MissionAction,
}

pub async fn list_missions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMissionsQuery>,
) -> Result<Json<Vec<Mission>>, CoordinationError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            MissionStatus::parse(raw)
                .ok_or_else(|| ValidationError::invalid("status", format!("unknown status '{raw}'")))?,
        ),
        None => None,
    };
    let filter = MissionFilter {
        status,
        assigned_drone: query.assigned_drone,
    };
    Ok(Json(state.list_missions(&filter).await?))
}

pub async fn get_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Mission>, CoordinationError> {
    Ok(Json(state.get_mission(&id).await?))
}

pub async fn create_mission(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateMissionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Mission>), CoordinationError> {
    let mission = state.create_mission(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(mission)))
}

pub async fn update_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMissionRequest>, JsonRejection>,
) -> Result<Json<Mission>, CoordinationError> {
    Ok(Json(state.update_mission(&id, body(payload)?).await?))
}

pub async fn delete_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, CoordinationError> {
    state.delete_mission(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ProgressBody>, JsonRejection>,
) -> Result<Json<Mission>, CoordinationError> {
    let ProgressBody { progress } = body(payload)?;
    Ok(Json(state.update_progress(&id, progress).await?))
}

pub async fn control_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ControlBody>, JsonRejection>,
) -> Result<Json<Mission>, CoordinationError> {
    let ControlBody { action } = body(payload)?;
    Ok(Json(state.control_mission(&id, action).await?))
}

pub async fn mission_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MissionStatusStats>>, CoordinationError> {
    Ok(Json(state.mission_stats().await?))
}
