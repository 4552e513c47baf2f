//! Marathon deployment action plugin
//!
//! Renders the application template, creates or force-updates the
//! application, then optionally waits on every deployment it started.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use crate::deploy::aggregate::{Aggregator, SubDeployment, SubDeploymentWaiter};
use crate::deploy::options::MarathonOptions;
use crate::deploy::retry::{retry, tokio_sleep, AttemptOutcome, RetryPolicy};
use crate::deploy::ticker::{ProgressTicker, TICK_PERIOD};
use crate::deploy::DeploymentPlugin;
use crate::errors::PluginError;
use crate::filesys::file::File;
use crate::http::client::ClientOptions;
use crate::http::marathon::{Credentials, MarathonClient};
use crate::interpolate::{Interpolate, Template};
use crate::job::context::JobContext;
use crate::job::result::RunResult;

pub const PLUGIN_NAME: &str = "marathon";

/// Labels always stamped on the application
const LABELS: &[(&str, &str)] = &[
    ("CDS_VERSION", "cds.version"),
    ("CDS_PROJECT", "cds.project"),
    ("CDS_APPLICATION", "cds.application"),
    ("CDS_ENVIRONMENT", "cds.environment"),
];

/// Labels stamped only when the option is set
const OPTIONAL_LABELS: &[(&str, &str)] = &[
    ("CDS_WORKFLOW", "cds.workflow"),
    ("CDS_RUN", "cds.run"),
    ("CDS_GIT_REPOSITORY", "git.repository"),
    ("CDS_GIT_BRANCH", "git.branch"),
    ("CDS_GIT_HASH", "git.hash"),
];

/// Marathon deployment plugin
#[derive(Debug, Clone)]
pub struct MarathonPlugin {
    http_timeout: Duration,
    aggregator: Aggregator,
}

impl Default for MarathonPlugin {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl MarathonPlugin {
    pub fn new(http_timeout: Duration) -> Self {
        Self {
            http_timeout,
            aggregator: Aggregator::new(),
        }
    }

    /// Override the aggregator, mostly to shorten its grace
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    async fn deploy(&self, job: Arc<dyn JobContext>) -> Result<HashMap<String, String>, PluginError> {
        let mut options = MarathonOptions::from_job(job.as_ref())?;
        if options.insecure_skip_verify {
            job.warn("You are using insecureSkipVerify flag to true. It is not recommended");
        }

        let credentials = options.user.take().map(|user| Credentials {
            user,
            password: options
                .password
                .take()
                .unwrap_or_else(|| String::new().into()),
        });

        job.info(&format!("Connecting on {}", options.url));
        let client = Arc::new(MarathonClient::new(
            &options.url,
            credentials,
            &ClientOptions {
                timeout: self.http_timeout,
                insecure_skip_verify: options.insecure_skip_verify,
            },
        )?);

        let app = render_application(job.as_ref(), &options.configuration).await?;
        let app_id = application_id(&app)?;
        job.info(&format!("Configuration File {}: OK", options.configuration));

        if client.application_exists(&app_id).await? {
            client.update_application(&app_id, &app).await?;
            job.info(&format!("Application updated {}: OK", app_id));
        } else {
            client.create_application(&app).await?;
            job.info(&format!("Application creation {}: OK", app_id));
        }

        let mut outputs = HashMap::from([("marathon.app.id".to_string(), app_id.clone())]);
        if !options.wait_for_deployment {
            return Ok(outputs);
        }

        let ticker = ProgressTicker::start(job.clone(), app_id.clone(), TICK_PERIOD);
        job.info(&format!(
            "Application {} deployment in progress please wait...",
            app_id
        ));

        let deployments: Vec<SubDeployment> = client
            .application_deployments(&app_id)
            .await?
            .into_iter()
            .map(|d| SubDeployment::new(d.id, options.timeout))
            .collect();
        info!(app = %app_id, count = deployments.len(), "Waiting on Marathon deployments");
        outputs.insert(
            "marathon.deployments".to_string(),
            deployments.len().to_string(),
        );

        let waiter = Arc::new(MarathonDeploymentWaiter {
            client,
            policy: options.poll_policy(),
            timeout: options.timeout,
        });
        let result = self.aggregator.wait_all(job.clone(), deployments, waiter).await;
        ticker.stop();

        if !result.success {
            return Err(PluginError::DeploymentFailed(result.details));
        }
        job.success(&format!("Application {} deployed", app_id));
        Ok(outputs)
    }
}

#[async_trait]
impl DeploymentPlugin for MarathonPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn description(&self) -> &'static str {
        "This action helps you to deploy on Mesos/Marathon. Provide a marathon.json file to configure deployment."
    }

    async fn run(&self, job: Arc<dyn JobContext>) -> RunResult {
        let outcome = self.deploy(job.clone()).await;
        RunResult::from_outcome(job.as_ref(), outcome)
    }
}

/// Polls `/v2/deployments` until a deployment is gone
pub struct MarathonDeploymentWaiter {
    client: Arc<MarathonClient>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl MarathonDeploymentWaiter {
    pub fn new(client: Arc<MarathonClient>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            policy,
            timeout,
        }
    }
}

#[async_trait]
impl SubDeploymentWaiter for MarathonDeploymentWaiter {
    async fn wait(&self, id: &str) -> Result<(), PluginError> {
        let client = &self.client;
        let polled = retry(
            &self.policy,
            |_| async move {
                match client.has_deployment(id).await {
                    Ok(false) => AttemptOutcome::Success(()),
                    Ok(true) => AttemptOutcome::Retry(format!("deployment {} in progress", id)),
                    Err(e) => AttemptOutcome::from_result(Err(e)),
                }
            },
            tokio_sleep,
        )
        .await;

        match polled {
            Err(PluginError::RetriesExhausted { .. }) => Err(PluginError::Timeout {
                id: id.to_string(),
                after: self.timeout,
            }),
            other => other,
        }
    }
}

/// Read the template, interpolate it and stamp the CDS labels
pub async fn render_application(job: &dyn JobContext, path: &str) -> Result<Value, PluginError> {
    let raw = File::new(path).read_string().await.map_err(|e| {
        PluginError::Configuration(format!("configuration file error: {}", e))
    })?;

    let rendered = Template::curly()?.interpolate(&raw, job.options())?;
    job.info("Templating Configuration File: OK");

    let mut app: Value = serde_json::from_str(&rendered).map_err(|e| {
        PluginError::Configuration(format!("configuration file parse error: {}", e))
    })?;
    job.info("Parsing Configuration File: OK");

    let Some(object) = app.as_object_mut() else {
        return Err(PluginError::Configuration(
            "configuration file must hold a JSON object".to_string(),
        ));
    };
    apply_labels(job, object);
    Ok(app)
}

fn apply_labels(job: &dyn JobContext, app: &mut Map<String, Value>) {
    let labels = app
        .entry("labels")
        .and_modify(|v| {
            if !v.is_object() {
                *v = Value::Object(Map::new());
            }
        })
        .or_insert_with(|| Value::Object(Map::new()));

    let Some(labels) = labels.as_object_mut() else {
        return;
    };
    for (label, key) in LABELS {
        let value = job.option(key).unwrap_or_default();
        labels.insert(label.to_string(), Value::String(value.to_string()));
    }
    for (label, key) in OPTIONAL_LABELS {
        if let Some(value) = job.option(key).filter(|v| !v.is_empty()) {
            labels.insert(label.to_string(), Value::String(value.to_string()));
        }
    }
}

fn application_id(app: &Value) -> Result<String, PluginError> {
    app.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            PluginError::Configuration("application id is missing from configuration".to_string())
        })
}
