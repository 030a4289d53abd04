//! API routes for the survey server.

pub mod drones;
pub mod missions;
pub mod reports;
pub mod request_id;
mod routes;
pub mod ws;

use axum::{extract::rejection::JsonRejection, Json, Router};
use survey_core::ValidationError;

use crate::error::CoordinationError;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

/// Unwrap a JSON body, reporting rejections as validation errors.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CoordinationError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::invalid("body", rejection.body_text()).into())
}

#[cfg(test)]
mod tests;
