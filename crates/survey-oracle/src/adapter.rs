//! Fallback policy around the external oracles.
//!
//! Every call is bounded by a timeout. Any failure is logged and replaced by
//! a deterministic local result, so oracle trouble never fails a caller.

use futures::future::join_all;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use survey_core::{validate_ring, FlightParameters, Mission, SurveyArea};

use crate::error::OracleError;
use crate::parse::ring_from_value;
use crate::{ChatOracle, DisabledOracle, PathOracle, ReportOracle};

pub const CHAT_FAILURE_REPLY: &str = "Sorry, something went wrong with the chatbot.";
pub const CHAT_QUOTA_REPLY: &str = "Chatbot quota exceeded. Please try again later.";

#[derive(Clone)]
pub struct OracleAdapter {
    path: Arc<dyn PathOracle>,
    report: Arc<dyn ReportOracle>,
    chat: Arc<dyn ChatOracle>,
    timeout: Duration,
}

impl OracleAdapter {
    pub fn new(
        path: Arc<dyn PathOracle>,
        report: Arc<dyn ReportOracle>,
        chat: Arc<dyn ChatOracle>,
        timeout: Duration,
    ) -> Self {
        Self {
            path,
            report,
            chat,
            timeout,
        }
    }

    /// One backend serving all three roles.
    pub fn uniform<O>(oracle: Arc<O>, timeout: Duration) -> Self
    where
        O: PathOracle + ReportOracle + ChatOracle + 'static,
    {
        Self::new(oracle.clone(), oracle.clone(), oracle, timeout)
    }

    /// Adapter that always falls back.
    pub fn disabled() -> Self {
        Self::uniform(Arc::new(DisabledOracle), Duration::from_secs(1))
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, OracleError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        }
    }

    /// Optimized flight ring, or the area's own ring when the oracle fails or
    /// answers with something that is not a valid closed ring.
    pub async fn optimize_path(&self, area: &SurveyArea, parameters: &FlightParameters) -> Vec<[f64; 2]> {
        let outcome = self
            .bounded(self.path.optimize_path(area, parameters))
            .await
            .and_then(|value| {
                let ring = ring_from_value(&value)
                    .ok_or_else(|| OracleError::malformed("coordinates are not a ring"))?;
                validate_ring(&ring).map_err(|err| OracleError::malformed(err.to_string()))?;
                Ok(ring)
            });

        match outcome {
            Ok(ring) => ring,
            Err(err) => {
                log_degraded("path optimization", &err);
                area.ring().to_vec()
            }
        }
    }

    /// Report summary text, or a fixed note naming the mission.
    pub async fn summarize(&self, mission: &Mission, analysis: &[Value]) -> String {
        match self.bounded(self.report.summarize(mission, analysis)).await {
            Ok(summary) => summary,
            Err(err) => {
                log_degraded("report summarization", &err);
                fallback_summary(mission)
            }
        }
    }

    /// Analysis for each image, in input order. Failed images get a neutral
    /// placeholder entry.
    pub async fn analyze_images(&self, images: &[String]) -> Vec<Value> {
        let calls = images.iter().map(|image| async move {
            match self.bounded(self.report.analyze_image(image)).await {
                Ok(analysis) => analysis,
                Err(err) => {
                    log_degraded("image analysis", &err);
                    json!({ "image": image, "objects": [], "confidence": 0.0 })
                }
            }
        });
        join_all(calls).await
    }

    /// Reply to an operator chat message.
    pub async fn chat(&self, message: &str, context: Option<&Value>) -> String {
        match self.bounded(self.chat.reply(message, context)).await {
            Ok(reply) => reply,
            Err(OracleError::Quota) => {
                log_degraded("chat", &OracleError::Quota);
                CHAT_QUOTA_REPLY.to_string()
            }
            Err(err) => {
                log_degraded("chat", &err);
                CHAT_FAILURE_REPLY.to_string()
            }
        }
    }
}

pub fn fallback_summary(mission: &Mission) -> String {
    format!(
        "Mission \"{}\" completed. No detailed analysis available due to an error.",
        mission.name
    )
}

fn log_degraded(operation: &str, err: &OracleError) {
    match err {
        OracleError::Disabled => {
            tracing::debug!("Oracle disabled, using fallback for {}", operation)
        }
        _ => tracing::warn!("Oracle degraded during {}: {} (using fallback)", operation, err),
    }
}
