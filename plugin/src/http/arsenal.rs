//! Arsenal deployment API client

use async_trait::async_trait;
use deploy_models::models::arsenal::{
    AlternativeConfig, DeployRequest, DeployResponse, FollowupState,
};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::errors::PluginError;
use crate::http::client::{ClientOptions, HttpClient};
use crate::http::{DeploymentClient, FollowUpHandle};

pub const DEPLOYMENT_TOKEN_HEADER: &str = "X-Arsenal-Deployment-Token";
pub const FOLLOWUP_TOKEN_HEADER: &str = "X-Arsenal-Followup-Token";

/// Client of the Arsenal public API
pub struct ArsenalClient {
    http: HttpClient,
    deployment_token: SecretString,
}

impl ArsenalClient {
    pub fn new(
        host: &str,
        deployment_token: SecretString,
        options: &ClientOptions,
    ) -> Result<Self, PluginError> {
        Ok(Self {
            http: HttpClient::new(host, options)?,
            deployment_token,
        })
    }

    pub fn host(&self) -> &str {
        self.http.base_url()
    }
}

#[async_trait]
impl DeploymentClient for ArsenalClient {
    async fn submit(&self, request: &DeployRequest) -> Result<FollowUpHandle, PluginError> {
        let req = self
            .http
            .request(Method::POST, "/deploy")
            .header(DEPLOYMENT_TOKEN_HEADER, self.deployment_token.expose_secret())
            .json(request);

        let response = self
            .http
            .execute(req)
            .await?
            .error_for_status("deploy request")?;

        let body: DeployResponse = response.json()?;
        match body.followup_token {
            Some(token) if !token.is_empty() => Ok(FollowUpHandle(token)),
            _ => Err(PluginError::Protocol("no followup token returned".to_string())),
        }
    }

    async fn poll(&self, handle: &FollowUpHandle) -> Result<Option<FollowupState>, PluginError> {
        let req = self
            .http
            .request(Method::GET, "/follow")
            .header(FOLLOWUP_TOKEN_HEADER, handle.as_str());

        let response = self.http.execute(req).await?;
        if response.status == StatusCode::SERVICE_UNAVAILABLE {
            debug!("Follow request answered 503, no state yet");
            return Ok(None);
        }

        let response = response.error_for_status("follow request")?;
        Ok(Some(response.json()?))
    }

    async fn upsert_variant(&self, variant: &AlternativeConfig) -> Result<(), PluginError> {
        let req = self
            .http
            .request(Method::POST, "/alternative")
            .header(DEPLOYMENT_TOKEN_HEADER, self.deployment_token.expose_secret())
            .json(variant);

        self.http
            .execute(req)
            .await?
            .error_for_status("upsert alternative request")?;
        Ok(())
    }

    async fn delete_variant(&self, name: &str) -> Result<(), PluginError> {
        let req = self
            .http
            .request_segments(Method::DELETE, &["alternative", name])?
            .header(DEPLOYMENT_TOKEN_HEADER, self.deployment_token.expose_secret());

        self.http
            .execute(req)
            .await?
            .error_for_status("delete alternative request")?;
        Ok(())
    }
}
