//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use deploy_models::models::plugin::{ErrorResponse, PluginInfo, RunRequest};
use http::StatusCode;
use serde::Serialize;
use tracing::info;

use crate::job::context::{Job, JobContext};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "cdsdeploy".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Registered plugins
pub async fn plugins_handler(State(state): State<Arc<ServerState>>) -> Json<Vec<PluginInfo>> {
    Json(state.registry.list())
}

/// Run a plugin to completion and answer its result
///
/// A failed deployment is still a 200, the verdict is in the result body.
pub async fn run_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    Json(request): Json<RunRequest>,
) -> Response {
    let Some(plugin) = state.registry.get(&name) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not_found".to_string(),
                message: format!("unknown plugin {}", name),
            }),
        )
            .into_response();
    };

    let job: Arc<dyn JobContext> = Arc::new(Job::new(request.options, state.sink.clone()));
    info!(plugin = %name, run_id = job.run_id(), "Plugin run requested");

    let result = plugin.run(job).await;
    info!(plugin = %name, status = %result.status, "Plugin run finished");
    Json(result).into_response()
}
