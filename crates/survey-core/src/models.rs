//! Core data models for survey fleet coordination.
//!
//! Records serialize with camelCase keys; geographic points are always
//! `[longitude, latitude]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

// ========== DRONE MODELS ==========

/// A fleet asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drone {
    pub id: String,
    pub name: String,
    /// Unique across the fleet
    pub serial_number: String,
    pub status: DroneStatus,
    /// Percent, 0..=100
    pub battery_level: f64,
    pub location: GeoPoint,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default)]
    pub maintenance_history: Vec<MaintenanceRecord>,
    /// Display-only back-reference; `Mission::assigned_drone` is authoritative.
    #[serde(default)]
    pub last_mission: Option<String>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DroneStatus {
    /// Idle and free to be reserved
    #[default]
    Available,
    /// Bound to exactly one non-terminal mission
    InMission,
    Maintenance,
    Charging,
}

impl DroneStatus {
    pub const ALL: [DroneStatus; 4] = [
        DroneStatus::Available,
        DroneStatus::InMission,
        DroneStatus::Maintenance,
        DroneStatus::Charging,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InMission => "in-mission",
            Self::Maintenance => "maintenance",
            Self::Charging => "charging",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    #[default]
    Point,
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default)]
    pub kind: PointKind,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            kind: PointKind::Point,
            coordinates: [lon, lat],
        }
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Flight envelope and sensor payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specifications {
    /// Minutes
    #[serde(default)]
    pub max_flight_time: Option<f64>,
    /// Meters per second
    #[serde(default)]
    pub max_speed: Option<f64>,
    /// Meters
    #[serde(default)]
    pub max_altitude: Option<f64>,
    #[serde(default)]
    pub sensors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDroneRequest {
    pub name: String,
    pub serial_number: String,
    pub status: Option<DroneStatus>,
    pub battery_level: Option<f64>,
    pub location: Option<GeoPoint>,
    pub specifications: Option<Specifications>,
}

impl CreateDroneRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "name is required"));
        }
        if self.serial_number.trim().is_empty() {
            return Err(ValidationError::invalid(
                "serialNumber",
                "serial number is required",
            ));
        }
        validate_drone_fields(self.battery_level, self.location.as_ref())
    }
}

/// Partial drone update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDroneRequest {
    pub name: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<DroneStatus>,
    pub battery_level: Option<f64>,
    pub location: Option<GeoPoint>,
    pub specifications: Option<Specifications>,
}

impl UpdateDroneRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ValidationError::invalid("name", "name must not be empty"));
        }
        if matches!(self.serial_number.as_deref(), Some(serial) if serial.trim().is_empty()) {
            return Err(ValidationError::invalid(
                "serialNumber",
                "serial number must not be empty",
            ));
        }
        validate_drone_fields(self.battery_level, self.location.as_ref())
    }
}

fn validate_drone_fields(
    battery_level: Option<f64>,
    location: Option<&GeoPoint>,
) -> Result<(), ValidationError> {
    if let Some(level) = battery_level {
        if !(0.0..=100.0).contains(&level) {
            return Err(ValidationError::invalid(
                "batteryLevel",
                "battery level must be between 0 and 100",
            ));
        }
    }
    if let Some(location) = location {
        crate::spatial::validate_point(location.coordinates, "location.coordinates")?;
    }
    Ok(())
}

/// Per-status drone aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneStatusStats {
    pub status: DroneStatus,
    pub count: usize,
    pub avg_battery: f64,
    pub most_recent_update: Option<DateTime<Utc>>,
}

// ========== MISSION MODELS ==========

/// A scheduled survey over a polygonal area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub name: String,
    pub status: MissionStatus,
    pub survey_area: SurveyArea,
    pub parameters: FlightParameters,
    #[serde(default)]
    pub assigned_drone: Option<String>,
    pub schedule: Schedule,
    /// Percent, 0..=100
    pub progress: f64,
    /// Estimated remaining minutes
    pub eta: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Completed recurring mission this one was spawned from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionStatus {
    Planned,
    InProgress,
    /// Operator hold; the drone stays bound
    Paused,
    Completed,
    Aborted,
}

impl MissionStatus {
    pub const ALL: [MissionStatus; 5] = [
        MissionStatus::Planned,
        MissionStatus::InProgress,
        MissionStatus::Paused,
        MissionStatus::Completed,
        MissionStatus::Aborted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in-progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolygonKind {
    #[default]
    Polygon,
}

/// Single-ring GeoJSON polygon, `[[[lon, lat], ...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyArea {
    #[serde(rename = "type", default)]
    pub kind: PolygonKind,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl SurveyArea {
    pub fn from_ring(ring: Vec<[f64; 2]>) -> Self {
        Self {
            kind: PolygonKind::Polygon,
            coordinates: vec![ring],
        }
    }

    /// The outer ring, or an empty slice for a malformed area.
    pub fn ring(&self) -> &[[f64; 2]] {
        self.coordinates.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.coordinates.len() != 1 {
            return Err(ValidationError::invalid(
                "surveyArea",
                "polygon must have exactly one ring",
            ));
        }
        crate::spatial::validate_ring(self.ring())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightParameters {
    /// Meters
    pub altitude: f64,
    /// Meters per second
    pub speed: f64,
    /// Image overlap percent, 0..=100
    pub overlap: f64,
    pub pattern: SurveyPattern,
}

impl FlightParameters {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.altitude.is_finite() || self.altitude <= 0.0 {
            return Err(ValidationError::invalid(
                "parameters.altitude",
                "altitude must be a positive number",
            ));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ValidationError::invalid(
                "parameters.speed",
                "speed must be a positive number",
            ));
        }
        if !(0.0..=100.0).contains(&self.overlap) {
            return Err(ValidationError::invalid(
                "parameters.overlap",
                "overlap must be between 0 and 100",
            ));
        }
        Ok(())
    }

    pub fn merge(&self, patch: &ParametersPatch) -> Self {
        Self {
            altitude: patch.altitude.unwrap_or(self.altitude),
            speed: patch.speed.unwrap_or(self.speed),
            overlap: patch.overlap.unwrap_or(self.overlap),
            pattern: patch.pattern.unwrap_or(self.pattern),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyPattern {
    Crosshatch,
    Parallel,
    Perimeter,
}

impl fmt::Display for SurveyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Crosshatch => "crosshatch",
            Self::Parallel => "parallel",
            Self::Perimeter => "perimeter",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParametersPatch {
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub overlap: Option<f64>,
    pub pattern: Option<SurveyPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
}

impl Schedule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_recurring && self.frequency.is_none() {
            return Err(ValidationError::invalid(
                "schedule.frequency",
                "recurring missions need a frequency",
            ));
        }
        if let Some(end_time) = self.end_time {
            if end_time < self.start_time {
                return Err(ValidationError::invalid(
                    "schedule.endTime",
                    "end time precedes start time",
                ));
            }
        }
        Ok(())
    }

    /// Recurrence frequency, only when the schedule is recurring.
    pub fn recurrence(&self) -> Option<Frequency> {
        if self.is_recurring {
            self.frequency
        } else {
            None
        }
    }

    pub fn merge(&self, patch: &SchedulePatch) -> Self {
        Self {
            start_time: patch.start_time.unwrap_or(self.start_time),
            end_time: patch.end_time.or(self.end_time),
            is_recurring: patch.is_recurring.unwrap_or(self.is_recurring),
            frequency: patch.frequency.or(self.frequency),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Interval between recurrence checks. Months are a flat 30 days.
    pub fn period(self) -> std::time::Duration {
        const DAY_SECS: u64 = 24 * 60 * 60;
        let days = match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        };
        std::time::Duration::from_secs(days * DAY_SECS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_recurring: Option<bool>,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMissionRequest {
    pub name: String,
    pub survey_area: SurveyArea,
    pub parameters: FlightParameters,
    pub schedule: Schedule,
    #[serde(default)]
    pub assigned_drone: Option<String>,
}

impl CreateMissionRequest {
    /// Input checks that need no store access.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "name is required"));
        }
        self.survey_area.validate()?;
        self.parameters.validate()?;
        self.schedule.validate()
    }
}

/// Partial mission update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMissionRequest {
    pub name: Option<String>,
    pub survey_area: Option<SurveyArea>,
    pub parameters: Option<ParametersPatch>,
    pub schedule: Option<SchedulePatch>,
    pub assigned_drone: Option<String>,
    pub progress: Option<f64>,
}

/// Per-status mission aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionStatusStats {
    pub status: MissionStatus,
    pub count: usize,
    pub avg_progress: f64,
    #[serde(rename = "avgETA")]
    pub avg_eta: f64,
}

// ========== REPORT MODELS ==========

/// Immutable survey report derived from a mission snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub mission_id: String,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub flight_stats: FlightStats,
    /// Opaque image analysis output
    #[serde(default)]
    pub analysis: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub mission_id: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl GenerateReportRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mission_id.trim().is_empty() {
            return Err(ValidationError::invalid("missionId", "mission id is required"));
        }
        if self.images.is_empty() {
            return Err(ValidationError::invalid(
                "images",
                "at least one image is required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightStats {
    /// Minutes
    pub duration: f64,
    /// Meters
    pub distance: f64,
    /// Square meters
    pub coverage: f64,
}

impl FlightStats {
    pub fn from_mission(mission: &Mission) -> Self {
        let ring = mission.survey_area.ring();
        let elapsed = mission.updated_at - mission.created_at;
        Self {
            duration: (elapsed.num_milliseconds() as f64 / 60_000.0).max(0.0),
            distance: crate::spatial::path_length_m(ring),
            coverage: crate::spatial::bounding_box_area_m2(ring),
        }
    }
}

// ========== LIVE CHANNEL ==========

/// Drone position relayed to a mission channel.
///
/// Only `missionId` is interpreted; every other field is carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub mission_id: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Frame sent by a live-channel client, `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinMission(String),
    LeaveMission(String),
    DroneUpdate(PositionUpdate),
    ChatMessage(String),
}

/// Frame sent by the server on the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    DronePosition(PositionUpdate),
    ChatResponse(String),
    Error(String),
}
