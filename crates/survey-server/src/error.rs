//! Coordination errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use survey_core::{DroneStatus, InvalidTransition, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("drone {drone_id} is not available (currently {status})")]
    DroneUnavailable { drone_id: String, status: DroneStatus },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("serial number {0} is already registered")]
    DuplicateSerial(String),
    #[error("drone {0} is bound to a mission")]
    DroneBusy(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoordinationError {
    pub fn drone_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "drone",
            id: id.into(),
        }
    }

    pub fn mission_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "mission",
            id: id.into(),
        }
    }

    pub fn report_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "report",
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DroneUnavailable { .. }
            | Self::InvalidTransition(_)
            | Self::DuplicateSerial(_)
            | Self::DroneBusy(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoordinationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                json!({ "error": "Internal server error" })
            }
            Self::Validation(err) => json!({
                "error": err.to_string(),
                "field": err.field(),
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
