//! Error types for the deploy plugins

use std::time::Duration;

use thiserror::Error;

/// Main error type for the deploy plugins
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request rejected (HTTP status {status}): {body}")]
    RequestRejected { status: u16, body: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Deployment {id} timed out after {}s", .after.as_secs())]
    Timeout { id: String, after: Duration },

    #[error("Deployment cancelled externally")]
    CancelledExternally,

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Interpolation error: {0}")]
    Interpolation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PluginError {
    /// Whether the caller's retry loop may try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, PluginError::ServiceUnavailable(_))
    }
}

impl From<anyhow::Error> for PluginError {
    fn from(err: anyhow::Error) -> Self {
        PluginError::Internal(err.to_string())
    }
}
