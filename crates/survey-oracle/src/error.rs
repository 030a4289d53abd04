//! Oracle failure modes. None of these reach API callers; the adapter
//! logs them and falls back.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle quota exceeded")]
    Quota,
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
    #[error("oracle is not configured")]
    Disabled,
}

impl OracleError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Transport(format!("timeout: {err}"));
        }
        if err.is_decode() {
            return Self::Malformed(err.to_string());
        }
        Self::Transport(err.to_string())
    }
}
