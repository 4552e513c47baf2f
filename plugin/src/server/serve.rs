//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::PluginError;
use crate::server::handlers::{health_handler, plugins_handler, run_handler, version_handler};
use crate::server::state::ServerState;

/// Routes of the plugin host
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Plugins
        .route("/plugins", get(plugins_handler))
        .route("/plugins/{name}/run", post(run_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server, returns the bound address and the server task
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, JoinHandle<Result<(), PluginError>>), PluginError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| PluginError::ServerError(e.to_string()))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| PluginError::ServerError(e.to_string()))?;
    info!("Starting plugin host on {}", local_addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| PluginError::ServerError(e.to_string()))
    });

    Ok((local_addr, handle))
}
