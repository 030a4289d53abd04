pub mod error;
pub mod mission;
pub mod models;
pub mod spatial;

pub use error::{InvalidTransition, ValidationError};
pub use mission::{validate_progress, MissionAction};
pub use models::{
    ClientEvent, CreateDroneRequest, CreateMissionRequest, Drone, DroneStatus, DroneStatusStats,
    FlightParameters, FlightStats, Frequency, GenerateReportRequest, GeoPoint, MaintenanceRecord,
    Mission, MissionStatus, MissionStatusStats, ParametersPatch, PositionUpdate, Report, Schedule,
    SchedulePatch, ServerEvent, Specifications, SurveyArea, SurveyPattern, UpdateDroneRequest,
    UpdateMissionRequest,
};
pub use spatial::{
    bounding_box_area_m2, estimate_eta_minutes, path_length_m, validate_point, validate_ring,
};
