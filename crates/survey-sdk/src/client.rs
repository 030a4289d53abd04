//! REST client for drones, missions and reports.

use anyhow::Result;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use survey_core::{
    CreateDroneRequest, CreateMissionRequest, Drone, DroneStatus, DroneStatusStats,
    GenerateReportRequest, Mission, MissionAction, MissionStatus, MissionStatusStats, Report,
    UpdateDroneRequest, UpdateMissionRequest,
};

use crate::channel::MissionChannel;

/// Non-success answer from the server, carrying its `{"error": ...}` text.
#[derive(Debug, thiserror::Error)]
#[error("server returned {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    /// Offending field for validation failures.
    pub field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    field: Option<String>,
}

#[derive(Serialize)]
struct StatusBody {
    status: DroneStatus,
}

#[derive(Serialize)]
struct LocationBody {
    coordinates: [f64; 2],
}

#[derive(Serialize)]
struct ProgressBody {
    progress: f64,
}

#[derive(Serialize)]
struct ControlBody {
    action: MissionAction,
}

/// Client for the survey coordination server.
#[derive(Debug, Clone)]
pub struct SurveyClient {
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
}

impl SurveyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }

    // ========== DRONES ==========

    pub async fn list_drones(&self, status: Option<DroneStatus>) -> Result<Vec<Drone>> {
        let mut request = self.client.get(self.url("/api/drones"));
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        decode(request.send().await?).await
    }

    pub async fn get_drone(&self, id: &str) -> Result<Drone> {
        let response = self.client.get(self.url(&format!("/api/drones/{}", id))).send().await?;
        decode(response).await
    }

    /// Register a drone with the fleet.
    pub async fn create_drone(&self, request: &CreateDroneRequest) -> Result<Drone> {
        let response = self
            .client
            .post(self.url("/api/drones"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_drone(&self, id: &str, request: &UpdateDroneRequest) -> Result<Drone> {
        let response = self
            .client
            .patch(self.url(&format!("/api/drones/{}", id)))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn set_drone_status(&self, id: &str, status: DroneStatus) -> Result<Drone> {
        let response = self
            .client
            .patch(self.url(&format!("/api/drones/{}/status", id)))
            .json(&StatusBody { status })
            .send()
            .await?;
        decode(response).await
    }

    /// Report a drone's position as `[lon, lat]`.
    pub async fn set_drone_location(&self, id: &str, coordinates: [f64; 2]) -> Result<Drone> {
        let response = self
            .client
            .patch(self.url(&format!("/api/drones/{}/location", id)))
            .json(&LocationBody { coordinates })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_drone(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/drones/{}", id)))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn drone_stats(&self) -> Result<Vec<DroneStatusStats>> {
        decode(self.client.get(self.url("/api/drones/stats")).send().await?).await
    }

    // ========== MISSIONS ==========

    pub async fn list_missions(
        &self,
        status: Option<MissionStatus>,
        assigned_drone: Option<&str>,
    ) -> Result<Vec<Mission>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(status) = status {
            query.push(("status", status.as_str()));
        }
        if let Some(drone) = assigned_drone {
            query.push(("assignedDrone", drone));
        }
        let response = self
            .client
            .get(self.url("/api/missions"))
            .query(&query)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn get_mission(&self, id: &str) -> Result<Mission> {
        let response = self
            .client
            .get(self.url(&format!("/api/missions/{}", id)))
            .send()
            .await?;
        decode(response).await
    }

    /// Create a mission. Binding a drone starts it immediately.
    pub async fn create_mission(&self, request: &CreateMissionRequest) -> Result<Mission> {
        let response = self
            .client
            .post(self.url("/api/missions"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_mission(&self, id: &str, request: &UpdateMissionRequest) -> Result<Mission> {
        let response = self
            .client
            .patch(self.url(&format!("/api/missions/{}", id)))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Report progress in percent; 100 completes the mission.
    pub async fn update_progress(&self, id: &str, progress: f64) -> Result<Mission> {
        let response = self
            .client
            .patch(self.url(&format!("/api/missions/{}/progress", id)))
            .json(&ProgressBody { progress })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn control_mission(&self, id: &str, action: MissionAction) -> Result<Mission> {
        let response = self
            .client
            .post(self.url(&format!("/api/missions/{}/control", id)))
            .json(&ControlBody { action })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_mission(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/missions/{}", id)))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn mission_stats(&self) -> Result<Vec<MissionStatusStats>> {
        decode(self.client.get(self.url("/api/missions/stats")).send().await?).await
    }

    // ========== REPORTS ==========

    pub async fn generate_report(&self, request: &GenerateReportRequest) -> Result<Report> {
        let response = self
            .client
            .post(self.url("/api/reports"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_reports(&self, mission_id: Option<&str>) -> Result<Vec<Report>> {
        let mut request = self.client.get(self.url("/api/reports"));
        if let Some(mission_id) = mission_id {
            request = request.query(&[("missionId", mission_id)]);
        }
        decode(request.send().await?).await
    }

    pub async fn get_report(&self, id: &str) -> Result<Report> {
        let response = self
            .client
            .get(self.url(&format!("/api/reports/{}", id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_report(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/reports/{}", id)))
            .send()
            .await?;
        expect_success(response).await
    }

    // ========== LIVE CHANNEL ==========

    /// Open the live mission channel.
    pub async fn connect_channel(&self) -> Result<MissionChannel> {
        let url = build_ws_url(&self.base_url, "/ws")?;
        MissionChannel::connect(url.as_str()).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(api_error(response).await.into());
    }
    Ok(response.json().await?)
}

async fn expect_success(response: Response) -> Result<()> {
    if !response.status().is_success() {
        return Err(api_error(response).await.into());
    }
    Ok(())
}

async fn api_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ApiError {
            status,
            message: body.error,
            field: body.field,
        },
        Err(_) => ApiError {
            status,
            message: text,
            field: None,
        },
    }
}

fn build_ws_url(base: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => other,
    }
    .to_string();

    url.set_scheme(&scheme)
        .map_err(|_| anyhow::anyhow!("Invalid base URL scheme"))?;
    url.set_path(path);
    Ok(url)
}
