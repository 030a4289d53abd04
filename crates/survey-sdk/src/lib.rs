//! Survey SDK - client library for the coordination server
//!
//! `SurveyClient` wraps the REST API; `MissionChannel` speaks the live
//! mission protocol over WebSocket.

pub mod channel;
pub mod client;

pub use channel::MissionChannel;
pub use client::{ApiError, SurveyClient};
pub use survey_core::{ClientEvent, PositionUpdate, ServerEvent};
