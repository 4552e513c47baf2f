//! Arsenal deployment integration plugin
//!
//! Submits a deploy request, then follows it with the returned follow-up
//! token until it is done, cancelled, or the retries run out.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deploy_models::models::arsenal::{AlternativeConfig, DeployRequest};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::info;

use crate::deploy::follow::ProgressTracker;
use crate::deploy::options::ArsenalOptions;
use crate::deploy::retry::{retry, tokio_sleep, AttemptOutcome, RetryPolicy};
use crate::deploy::DeploymentPlugin;
use crate::errors::PluginError;
use crate::http::arsenal::ArsenalClient;
use crate::http::client::ClientOptions;
use crate::http::{DeploymentClient, FollowUpHandle};
use crate::interpolate::{Interpolate, Template};
use crate::job::context::JobContext;
use crate::job::result::RunResult;

pub const PLUGIN_NAME: &str = "arsenal";

const VERSION_TEMPLATE: &str = "{{.cds.integration.deployment.version}}";

/// Metadata attached to every deploy request
const METADATA_TEMPLATE: &[(&str, &str)] = &[
    ("CDS_APPLICATION", "{{.cds.application}}"),
    ("CDS_RUN", "{{.cds.run}}"),
    ("CDS_ENVIRONMENT", "{{.cds.integration.deployment}}"),
    ("CDS_GIT_BRANCH", "{{.git.branch}}"),
    ("CDS_WORKFLOW", "{{.cds.workflow}}"),
    ("CDS_PROJECT", "{{.cds.project}}"),
    ("CDS_VERSION", "{{.cds.version}}"),
    ("CDS_GIT_REPOSITORY", "{{.git.repository}}"),
    ("CDS_GIT_HASH", "{{.git.hash}}"),
];

/// Arsenal deployment plugin
#[derive(Debug, Clone)]
pub struct ArsenalPlugin {
    http_timeout: Duration,
}

impl Default for ArsenalPlugin {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(60),
        }
    }
}

impl ArsenalPlugin {
    pub fn new(http_timeout: Duration) -> Self {
        Self { http_timeout }
    }

    async fn deploy(&self, job: &dyn JobContext) -> Result<HashMap<String, String>, PluginError> {
        let options = ArsenalOptions::from_job(job)?;
        if options.insecure_skip_verify {
            job.warn("You are using insecureSkipVerify flag to true. It is not recommended");
        }

        let client = ArsenalClient::new(
            &options.host,
            SecretString::from(options.deployment_token.expose_secret().to_owned()),
            &ClientOptions {
                timeout: self.http_timeout,
                insecure_skip_verify: options.insecure_skip_verify,
            },
        )?;

        run_deployment(job, &client, &options).await
    }
}

#[async_trait]
impl DeploymentPlugin for ArsenalPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn description(&self) -> &'static str {
        "OVH Arsenal Deployment Plugin"
    }

    async fn run(&self, job: Arc<dyn JobContext>) -> RunResult {
        let outcome = self.deploy(job.as_ref()).await;
        RunResult::from_outcome(job.as_ref(), outcome)
    }
}

/// Build the deploy request from the job options
pub fn build_request(
    job: &dyn JobContext,
    alternative: Option<String>,
) -> Result<DeployRequest, PluginError> {
    let template = Template::curly()?;
    let vars = job.options();

    let mut metadata = BTreeMap::new();
    for (key, value) in METADATA_TEMPLATE {
        metadata.insert(key.to_string(), template.interpolate(value, vars)?);
    }

    Ok(DeployRequest {
        version: template.interpolate(VERSION_TEMPLATE, vars)?,
        alternative,
        metadata,
    })
}

/// Resolve the alternative config, `None` when it renders empty
pub fn resolve_alternative(
    job: &dyn JobContext,
    raw: &str,
) -> Result<Option<AlternativeConfig>, PluginError> {
    let rendered = Template::square()?.interpolate(raw, job.options())?;
    if rendered.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(&rendered) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            job.info(&format!("Resolved alternative: {}", rendered));
            Err(PluginError::Configuration(format!(
                "failed to unmarshal alternative config: {}",
                e
            )))
        }
    }
}

/// Submit and follow one Arsenal deployment
pub async fn run_deployment<C>(
    job: &dyn JobContext,
    client: &C,
    options: &ArsenalOptions,
) -> Result<HashMap<String, String>, PluginError>
where
    C: DeploymentClient + ?Sized,
{
    let mut outputs = HashMap::new();

    let alternative = match &options.alternative_template {
        Some(raw) => resolve_alternative(job, raw)?,
        None => None,
    };
    if let Some(alt) = &alternative {
        job.info(&format!("Creating alternative {} on Arsenal...", alt.name));
        retry(
            &options.retry,
            |_| async move { AttemptOutcome::from_result(client.upsert_variant(alt).await) },
            tokio_sleep,
        )
        .await?;
        outputs.insert("arsenal.alternative".to_string(), alt.name.clone());
    }

    let request = build_request(job, alternative.as_ref().map(|a| a.name.clone()))?;
    job.info(&format!(
        "Deploying {} ({}) on Arsenal...",
        options.application, request
    ));

    let handle = submit(job, client, &request, &options.retry).await?;
    info!(application = %options.application, "Deployment submitted, following up");

    let followed = follow(job, client, &handle, &options.retry).await;

    if let Some(alt) = alternative.as_ref().filter(|_| options.alternative_cleanup) {
        if let Err(e) = client.delete_variant(&alt.name).await {
            job.warn(&format!("Unable to delete alternative {}: {}", alt.name, e));
        }
    }

    followed?;
    job.success("Deployment succeeded.");
    Ok(outputs)
}

/// Submit phase, retried while the service is unavailable
pub async fn submit<C>(
    job: &dyn JobContext,
    client: &C,
    request: &DeployRequest,
    policy: &RetryPolicy,
) -> Result<FollowUpHandle, PluginError>
where
    C: DeploymentClient + ?Sized,
{
    retry(
        policy,
        |_| async move {
            let outcome = AttemptOutcome::from_result(client.submit(request).await);
            if let AttemptOutcome::Retry(reason) = &outcome {
                job.info(&format!("Arsenal service unavailable ({}), waiting for next retry", reason));
            }
            outcome
        },
        tokio_sleep,
    )
    .await
}

/// Follow-up phase, polled until done, cancelled or out of retries
pub async fn follow<C>(
    job: &dyn JobContext,
    client: &C,
    handle: &FollowUpHandle,
    policy: &RetryPolicy,
) -> Result<(), PluginError>
where
    C: DeploymentClient + ?Sized,
{
    let tracker = Mutex::new(ProgressTracker::new());
    let tracker = &tracker;

    retry(
        policy,
        |_| async move {
            job.info("Fetching followup status on deployment...");
            let outcome = match client.poll(handle).await {
                Ok(state) => tracker.lock().await.classify(state),
                Err(e) => AttemptOutcome::from_result(Err(e)),
            };
            match &outcome {
                AttemptOutcome::Retry(reason) => job.info(&format!("{}...", capitalize(reason))),
                AttemptOutcome::Failure(PluginError::CancelledExternally) => {
                    job.info("Deployment cancelled.")
                }
                _ => {}
            }
            outcome
        },
        tokio_sleep,
    )
    .await
    .map(|_| ())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
