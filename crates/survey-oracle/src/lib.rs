//! Survey Oracle - external optimization and summarization collaborators
//!
//! The oracles are best-effort: [`OracleAdapter`] bounds every call with a
//! timeout and substitutes a deterministic local result on failure.

pub mod adapter;
pub mod client;
pub mod error;
pub mod parse;

use async_trait::async_trait;
use serde_json::Value;
use survey_core::{FlightParameters, Mission, SurveyArea};

pub use adapter::OracleAdapter;
pub use client::HttpOracle;
pub use error::OracleError;

/// Turns a survey polygon and flight parameters into an optimized path.
#[async_trait]
pub trait PathOracle: Send + Sync {
    /// Raw `coordinates` value as returned by the oracle; either a single
    /// ring or a polygon of rings.
    async fn optimize_path(
        &self,
        area: &SurveyArea,
        parameters: &FlightParameters,
    ) -> Result<Value, OracleError>;
}

/// Produces report text and per-image analysis.
#[async_trait]
pub trait ReportOracle: Send + Sync {
    async fn summarize(&self, mission: &Mission, analysis: &[Value]) -> Result<String, OracleError>;

    async fn analyze_image(&self, image: &str) -> Result<Value, OracleError>;
}

/// Answers free-text operator questions.
#[async_trait]
pub trait ChatOracle: Send + Sync {
    async fn reply(&self, message: &str, context: Option<&Value>) -> Result<String, OracleError>;
}

/// Oracle that is not configured; every call fails with
/// [`OracleError::Disabled`] so callers always take the fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOracle;

#[async_trait]
impl PathOracle for DisabledOracle {
    async fn optimize_path(&self, _: &SurveyArea, _: &FlightParameters) -> Result<Value, OracleError> {
        Err(OracleError::Disabled)
    }
}

#[async_trait]
impl ReportOracle for DisabledOracle {
    async fn summarize(&self, _: &Mission, _: &[Value]) -> Result<String, OracleError> {
        Err(OracleError::Disabled)
    }

    async fn analyze_image(&self, _: &str) -> Result<Value, OracleError> {
        Err(OracleError::Disabled)
    }
}

#[async_trait]
impl ChatOracle for DisabledOracle {
    async fn reply(&self, _: &str, _: Option<&Value>) -> Result<String, OracleError> {
        Err(OracleError::Disabled)
    }
}
