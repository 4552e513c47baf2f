//! Plugin host run loop

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::deploy::PluginRegistry;
use crate::errors::PluginError;
use crate::job::context::{Job, JobContext};
use crate::job::result::RunResult;
use crate::job::sink::{LogSink, TracingSink};
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Serve the plugin host until the shutdown signal resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PluginError> {
    info!("Initializing deployment plugin host...");

    let registry = Arc::new(PluginRegistry::with_defaults(options.http_timeout)?);
    let state = Arc::new(ServerState::new(registry, Arc::new(TracingSink)));

    let (_addr, handle) = serve(&options.server, state, shutdown_signal).await?;

    // the server stops accepting once the signal fires, in-flight runs drain
    let joined = handle
        .await
        .map_err(|e| PluginError::ServerError(e.to_string()))?;

    if let Err(e) = &joined {
        error!("Plugin host stopped with an error: {}", e);
    }
    info!("Shutdown complete");
    joined
}

/// Run one plugin in-process with the given options
pub async fn run_plugin(
    registry: &PluginRegistry,
    name: &str,
    options: HashMap<String, String>,
    sink: Arc<dyn LogSink>,
) -> Result<RunResult, PluginError> {
    let plugin = registry
        .get(name)
        .ok_or_else(|| PluginError::Configuration(format!("unknown plugin {}", name)))?;

    let job: Arc<dyn JobContext> = Arc::new(Job::new(options, sink));
    info!(plugin = name, run_id = job.run_id(), "Running plugin");
    Ok(plugin.run(job).await)
}
