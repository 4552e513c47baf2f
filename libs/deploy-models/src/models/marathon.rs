//! Marathon REST API models
//!
//! Only the fields the deploy plugin reads are modelled; application
//! definitions travel as raw JSON.

use serde::{Deserialize, Serialize};

/// Reference to an in-flight deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub id: String,
}

/// Application as returned by Marathon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: String,

    #[serde(default)]
    pub deployments: Vec<DeploymentRef>,
}

/// `GET /v2/apps?id=...`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsResponse {
    #[serde(default)]
    pub apps: Vec<App>,
}

/// `GET /v2/apps/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppResponse {
    pub app: App,
}

/// `PUT /v2/apps/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub deployment_id: String,

    #[serde(default)]
    pub version: Option<String>,
}

/// Entry of `GET /v2/deployments`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub id: String,

    #[serde(default)]
    pub affected_apps: Vec<String>,

    #[serde(default)]
    pub current_step: Option<u32>,

    #[serde(default)]
    pub total_steps: Option<u32>,
}
