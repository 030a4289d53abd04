//! HTTP client for a text-generation oracle service.
//!
//! The service exposes two endpoints:
//! - `POST {base}/v1/generate` with `{"prompt": ...}` returning `{"text": ...}`
//! - `POST {base}/v1/analyze-image` with `{"image": ...}` returning any JSON

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use survey_core::{FlightParameters, Mission, SurveyArea};

use crate::error::OracleError;
use crate::parse::extract_json_object;
use crate::{ChatOracle, PathOracle, ReportOracle};

/// Oracle backed by a remote generation service.
pub struct HttpOracle {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeImageRequest<'a> {
    image: &'a str,
}

impl HttpOracle {
    /// Create a new oracle client. An empty key sends no Authorization header.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create oracle HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value, OracleError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .authorize(self.client.post(&url).json(body))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::Quota);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Transport(format!("{} {}", status, body)));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let value = self.post_json("/v1/generate", &GenerateRequest { prompt }).await?;
        let response: GenerateResponse = serde_json::from_value(value)
            .map_err(|err| OracleError::malformed(format!("generate response: {err}")))?;
        Ok(response.text)
    }
}

#[async_trait]
impl PathOracle for HttpOracle {
    async fn optimize_path(
        &self,
        area: &SurveyArea,
        parameters: &FlightParameters,
    ) -> Result<Value, OracleError> {
        let prompt = path_prompt(area, parameters);
        let text = self.generate(&prompt).await?;
        let object = extract_json_object(&text)
            .ok_or_else(|| OracleError::malformed("no JSON object in path response"))?;
        object
            .get("coordinates")
            .cloned()
            .ok_or_else(|| OracleError::malformed("path response has no coordinates"))
    }
}

#[async_trait]
impl ReportOracle for HttpOracle {
    async fn summarize(&self, mission: &Mission, analysis: &[Value]) -> Result<String, OracleError> {
        let prompt = report_prompt(mission, analysis);
        let text = self.generate(&prompt).await?;
        let object = extract_json_object(&text)
            .ok_or_else(|| OracleError::malformed("no JSON object in report response"))?;
        match object.get("summary").and_then(Value::as_str) {
            Some(summary) if !summary.trim().is_empty() => Ok(summary.trim().to_string()),
            _ => Err(OracleError::malformed("report response has no summary")),
        }
    }

    async fn analyze_image(&self, image: &str) -> Result<Value, OracleError> {
        self.post_json("/v1/analyze-image", &AnalyzeImageRequest { image })
            .await
    }
}

#[async_trait]
impl ChatOracle for HttpOracle {
    async fn reply(&self, message: &str, context: Option<&Value>) -> Result<String, OracleError> {
        let prompt = chat_prompt(message, context);
        let text = self.generate(&prompt).await?;
        let reply = text.trim();
        if reply.is_empty() {
            return Err(OracleError::malformed("empty chat reply"));
        }
        Ok(reply.to_string())
    }
}

fn path_prompt(area: &SurveyArea, parameters: &FlightParameters) -> String {
    format!(
        "Optimize a drone survey flight path over the polygon {coords} \
         (coordinates are [longitude, latitude]). Pattern: {pattern}. \
         Altitude: {altitude} m. Speed: {speed} m/s. Image overlap: {overlap}%. \
         Reply with only a JSON object whose \"coordinates\" key holds the \
         optimized closed ring.",
        coords = serde_json::to_string(&area.coordinates).unwrap_or_default(),
        pattern = parameters.pattern,
        altitude = parameters.altitude,
        speed = parameters.speed,
        overlap = parameters.overlap,
    )
}

fn report_prompt(mission: &Mission, analysis: &[Value]) -> String {
    format!(
        "Write a 200-300 word survey report for drone mission \"{name}\". \
         Status: {status}. Progress: {progress}%. Pattern: {pattern} at {altitude} m, \
         {speed} m/s, {overlap}% overlap. Assigned drone: {drone}. \
         Started: {start}. Last update: {updated}. Image analysis: {analysis}. \
         Cover performance, coverage and notable findings. Reply with only a \
         JSON object with a \"summary\" key.",
        name = mission.name,
        status = mission.status,
        progress = mission.progress,
        pattern = mission.parameters.pattern,
        altitude = mission.parameters.altitude,
        speed = mission.parameters.speed,
        overlap = mission.parameters.overlap,
        drone = mission.assigned_drone.as_deref().unwrap_or("N/A"),
        start = mission.schedule.start_time.to_rfc3339(),
        updated = mission.updated_at.to_rfc3339(),
        analysis = serde_json::to_string(analysis).unwrap_or_default(),
    )
}

fn chat_prompt(message: &str, context: Option<&Value>) -> String {
    let mut prompt = format!(
        "You assist operators of a drone survey fleet. Answer concisely and \
         with actionable detail. Operator message: \"{}\"",
        message
    );
    if let Some(context) = context {
        prompt.push_str("\nRelevant record: ");
        prompt.push_str(&context.to_string());
    }
    prompt
}
