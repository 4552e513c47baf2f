//! Plugin host models

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Run request accepted by the plugin host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Registered plugin listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
