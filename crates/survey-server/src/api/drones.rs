//! Drone API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use survey_core::{
    CreateDroneRequest, Drone, DroneStatus, DroneStatusStats, UpdateDroneRequest, ValidationError,
};

use crate::api::body;
use crate::error::CoordinationError;
use crate::persistence::DroneFilter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListDronesQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: DroneStatus,
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

pub async fn list_drones(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDronesQuery>,
) -> Result<Json<Vec<Drone>>, CoordinationError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            DroneStatus::parse(raw)
                .ok_or_else(|| ValidationError::invalid("status", format!("unknown status '{raw}'")))?,
        ),
        None => None,
    };
    Ok(Json(state.list_drones(&DroneFilter { status }).await?))
}

pub async fn get_drone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Drone>, CoordinationError> {
    Ok(Json(state.get_drone(&id).await?))
}

pub async fn create_drone(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDroneRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Drone>), CoordinationError> {
    let drone = state.create_drone(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(drone)))
}

pub async fn update_drone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDroneRequest>, JsonRejection>,
) -> Result<Json<Drone>, CoordinationError> {
    Ok(Json(state.update_drone(&id, body(payload)?).await?))
}

pub async fn delete_drone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, CoordinationError> {
    state.delete_drone(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<Drone>, CoordinationError> {
    let StatusBody { status } = body(payload)?;
    Ok(Json(state.set_drone_status(&id, status).await?))
}

pub async fn set_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<Drone>, CoordinationError> {
    let LocationBody { coordinates } = body(payload)?;
    Ok(Json(state.set_drone_location(&id, coordinates).await?))
}

pub async fn drone_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DroneStatusStats>>, CoordinationError> {
    Ok(Json(state.drone_stats().await?))
}
