//! Plugin host HTTP tests

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use cdsdeploy::app::options::ServerOptions;
use cdsdeploy::deploy::PluginRegistry;
use cdsdeploy::job::result::{RunResult, Status};
use cdsdeploy::job::sink::MemorySink;
use cdsdeploy::server::serve::{router, serve};
use cdsdeploy::server::state::ServerState;
use http::{Request, StatusCode};
use tower::ServiceExt;

use support::ArsenalMock;

fn state() -> (Arc<ServerState>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let registry = PluginRegistry::with_defaults(Duration::from_secs(5)).unwrap();
    (
        Arc::new(ServerState::new(Arc::new(registry), sink.clone())),
        sink,
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn run_request(plugin: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(format!("/plugins/{plugin}/run"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (state, _) = state();
    let response = router(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "cdsdeploy");
}

#[tokio::test]
async fn test_version() {
    let (state, _) = state();
    let response = router(state)
        .oneshot(Request::get("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["git_hash"].is_string());
}

#[tokio::test]
async fn test_list_plugins() {
    let (state, _) = state();
    let response = router(state)
        .oneshot(Request::get("/plugins").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = body_json(response).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["arsenal", "marathon"]);
}

#[tokio::test]
async fn test_unknown_plugin_is_not_found() {
    let (state, _) = state();
    let response = router(state)
        .oneshot(run_request("nomad", serde_json::json!({ "options": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_failed_run_is_reported_in_body() {
    let (state, sink) = state();
    let response = router(state)
        .oneshot(run_request("marathon", serde_json::json!({ "options": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result: RunResult = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(result.status, Status::Fail);
    assert!(result.details.contains("missing marathon url"));
    assert!(sink.contains("missing marathon url"));
}

#[tokio::test]
async fn test_arsenal_run_over_http() {
    let mock = ArsenalMock::new(
        (200, r#"{"followup_token": "tok-1"}"#),
        &[(200, r#"{"done": true, "progress": 1.0}"#)],
    );
    let host = support::spawn(mock.router()).await;
    let (state, sink) = state();

    let response = router(state)
        .oneshot(run_request(
            "arsenal",
            serde_json::json!({
                "options": {
                    "cds.integration.deployment.host": host,
                    "cds.integration.deployment.token": "AB12CD34EF",
                    "cds.integration.deployment.retry.delay": "0"
                }
            }),
        ))
        .await
        .unwrap();

    let result: RunResult = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(result.status, Status::Success, "details: {}", result.details);
    assert_eq!(mock.follows(), 1);
    assert!(sink.contains("Deployment succeeded."));
}

#[tokio::test]
async fn test_serve_stops_on_shutdown_signal() {
    let (state, _) = state();
    let options = ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let (addr, handle) = serve(&options, state, async move {
        let _ = rx.await;
    })
    .await
    .unwrap();
    assert_ne!(addr.port(), 0);

    tx.send(()).unwrap();
    let joined = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(joined.is_ok());
}
