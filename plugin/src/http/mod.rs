//! Clients of the remote deployment services

pub mod arsenal;
pub mod client;
pub mod marathon;

use async_trait::async_trait;
use deploy_models::models::arsenal::{AlternativeConfig, DeployRequest, FollowupState};

use crate::errors::PluginError;

/// Opaque handle of an in-flight deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FollowUpHandle(pub String);

impl FollowUpHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FollowUpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote deployment service with submit/follow-up semantics
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    /// Submit a deployment and get its follow-up handle
    async fn submit(&self, request: &DeployRequest) -> Result<FollowUpHandle, PluginError>;

    /// Poll a deployment; `None` means the service has no state yet
    async fn poll(&self, handle: &FollowUpHandle) -> Result<Option<FollowupState>, PluginError>;

    /// Create or update a deployment variant
    async fn upsert_variant(&self, variant: &AlternativeConfig) -> Result<(), PluginError>;

    /// Delete a deployment variant
    async fn delete_variant(&self, name: &str) -> Result<(), PluginError>;
}
