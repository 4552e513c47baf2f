//! Marathon REST API client

use deploy_models::models::marathon::{
    App, AppResponse, AppsResponse, DeploymentInfo, DeploymentRef, UpdateResponse,
};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};

use crate::errors::PluginError;
use crate::http::client::{ClientOptions, HttpClient};

/// Basic auth credentials
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

/// Client of the Marathon v2 API
pub struct MarathonClient {
    http: HttpClient,
    credentials: Option<Credentials>,
}

impl MarathonClient {
    pub fn new(
        url: &str,
        credentials: Option<Credentials>,
        options: &ClientOptions,
    ) -> Result<Self, PluginError> {
        Ok(Self {
            http: HttpClient::new(url, options)?,
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        self.http.base_url()
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, PluginError> {
        let req = self.http.request_segments(method, segments)?;
        Ok(match &self.credentials {
            Some(c) => req.basic_auth(&c.user, Some(c.password.expose_secret())),
            None => req,
        })
    }

    /// Whether an application with this id exists
    pub async fn application_exists(&self, app_id: &str) -> Result<bool, PluginError> {
        let req = self.request(Method::GET, &["v2", "apps"])?.query(&[("id", app_id)]);
        let response = self
            .http
            .execute(req)
            .await?
            .error_for_status("list applications")?;
        let apps: AppsResponse = response.json()?;
        Ok(!apps.apps.is_empty())
    }

    /// Create an application, returns the deployments it started
    pub async fn create_application(
        &self,
        app: &serde_json::Value,
    ) -> Result<Vec<DeploymentRef>, PluginError> {
        let req = self.request(Method::POST, &["v2", "apps"])?.json(app);
        let response = self
            .http
            .execute(req)
            .await?
            .error_for_status("create application")?;
        let created: App = response.json()?;
        Ok(created.deployments)
    }

    /// Update an application, forcing over a running deployment
    pub async fn update_application(
        &self,
        app_id: &str,
        app: &serde_json::Value,
    ) -> Result<DeploymentRef, PluginError> {
        let req = self
            .request(Method::PUT, &app_segments(app_id))?
            .query(&[("force", "true")])
            .json(app);
        let response = self
            .http
            .execute(req)
            .await?
            .error_for_status("update application")?;
        let updated: UpdateResponse = response.json()?;
        Ok(DeploymentRef {
            id: updated.deployment_id,
        })
    }

    /// Deployments currently running for an application
    pub async fn application_deployments(
        &self,
        app_id: &str,
    ) -> Result<Vec<DeploymentRef>, PluginError> {
        let req = self.request(Method::GET, &app_segments(app_id))?;
        let response = self
            .http
            .execute(req)
            .await?
            .error_for_status("get application")?;
        let app: AppResponse = response.json()?;
        Ok(app.app.deployments)
    }

    /// Whether a deployment is still in flight
    pub async fn has_deployment(&self, deployment_id: &str) -> Result<bool, PluginError> {
        let req = self.request(Method::GET, &["v2", "deployments"])?;
        let response = self
            .http
            .execute(req)
            .await?
            .error_for_status("list deployments")?;
        let deployments: Vec<DeploymentInfo> = response.json()?;
        Ok(deployments.iter().any(|d| d.id == deployment_id))
    }
}

/// `/v2/apps/{id}` segments; group separators of the id become path
/// segments, each one encoded on its own
fn app_segments(app_id: &str) -> Vec<&str> {
    ["v2", "apps"]
        .into_iter()
        .chain(app_id.split('/').filter(|part| !part.is_empty()))
        .collect()
}
