use reqwest::StatusCode;
use thiserror::Error;

use crate::completion::provider::Provider;

/// Failures surfaced by completion and task calls.
///
/// Malformed individual completions are never reported here; they are
/// dropped by the response parser.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A required input is missing or invalid. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: Provider,
        status: StatusCode,
        body: String,
    },

    #[error("{provider} returned an unexpected response: {detail}")]
    InvalidResponse { provider: Provider, detail: String },

    #[error("failed to encode prompt example: {0}")]
    Encode(#[from] serde_json::Error),
}

impl QueryError {
    pub(crate) fn missing(what: &str) -> Self {
        Self::Configuration(format!("{what} is required"))
    }

    /// True for network and HTTP failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Api { .. } | Self::InvalidResponse { .. }
        )
    }
}
