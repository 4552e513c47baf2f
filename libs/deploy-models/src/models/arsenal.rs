//! Arsenal deployment API models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Deploy request sent to `POST /deploy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Omits metadata.
impl fmt::Display for DeployRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version: {}", self.version)?;
        if let Some(alternative) = &self.alternative {
            write!(f, "; Alternative: {}", alternative)?;
        }
        Ok(())
    }
}

/// Successful deploy response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    #[serde(default)]
    pub followup_token: Option<String>,
}

/// Follow-up state returned by `GET /follow`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowupState {
    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub progress: f64,
}

/// An alternative (variant) configuration of a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}
