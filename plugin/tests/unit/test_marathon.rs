//! Marathon plugin tests against an in-process mock API

mod support;

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use cdsdeploy::deploy::marathon::MarathonPlugin;
use cdsdeploy::deploy::DeploymentPlugin;
use cdsdeploy::job::result::Status;

use support::MarathonMock;

const TEMPLATE: &str = r#"{
    "id": "/web",
    "cpus": 0.1,
    "env": { "VERSION": "{{.cds.version}}" },
    "labels": { "team": "infra" }
}"#;

/// Write a template under the temp dir, unique per test
fn write_template(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("marathon-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn options<'a>(url: &'a str, template: &'a str, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    let mut pairs = vec![
        ("url", url),
        ("configuration", template),
        ("pollInterval", "10"),
        ("timeout", "5"),
        ("cds.version", "42"),
        ("cds.project", "KEY"),
        ("cds.application", "web"),
        ("cds.environment", "prod"),
        ("git.branch", "master"),
    ];
    pairs.extend_from_slice(extra);
    pairs
}

#[tokio::test]
async fn test_create_and_wait_for_deployment() {
    let mock = MarathonMock::new(false, &[("dep-1", 3)]);
    let url = support::spawn(mock.router()).await;
    let template = write_template(TEMPLATE);
    let template_path = template.to_string_lossy().to_string();
    let (job, sink) = support::job(&options(
        &url,
        &template_path,
        &[("user", "deployer"), ("password", "s3cr3tpw")],
    ));

    let result = MarathonPlugin::default().run(job).await;

    assert_eq!(result.status, Status::Success, "details: {}", result.details);
    assert_eq!(result.outputs["marathon.app.id"], "/web");
    assert_eq!(result.outputs["marathon.deployments"], "1");
    assert!(mock.deployments_calls.load(Ordering::SeqCst) >= 4);

    let created = mock.created.lock().unwrap().clone().unwrap();
    assert_eq!(created["env"]["VERSION"], "42");
    assert_eq!(created["labels"]["team"], "infra");
    assert_eq!(created["labels"]["CDS_VERSION"], "42");
    assert_eq!(created["labels"]["CDS_ENVIRONMENT"], "prod");
    assert_eq!(created["labels"]["CDS_GIT_BRANCH"], "master");
    assert!(created["labels"].get("CDS_GIT_HASH").is_none());
    assert!(mock.updated.lock().unwrap().is_none());

    let auth = mock.authorization.lock().unwrap().clone().unwrap();
    assert!(auth.starts_with("Basic "));

    assert!(sink.contains("Application creation /web: OK"));
    assert!(sink.contains("Deployment dep-1 succeeded"));
    assert!(!sink.contains("s3cr3tpw"));

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_existing_application_is_force_updated() {
    let mock = MarathonMock::new(true, &[("dep-2", 1)]);
    let url = support::spawn(mock.router()).await;
    let template = write_template(TEMPLATE);
    let template_path = template.to_string_lossy().to_string();
    let (job, sink) = support::job(&options(&url, &template_path, &[]));

    let result = MarathonPlugin::default().run(job).await;

    assert!(result.is_success(), "details: {}", result.details);
    let (id, force, body) = mock.updated.lock().unwrap().clone().unwrap();
    assert_eq!(id, "web");
    assert_eq!(force.as_deref(), Some("true"));
    assert_eq!(body["labels"]["CDS_PROJECT"], "KEY");
    assert!(mock.created.lock().unwrap().is_none());
    assert!(sink.contains("Application updated /web: OK"));

    let auth = mock.authorization.lock().unwrap().clone().unwrap();
    assert!(auth.is_empty());

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_no_wait_skips_deployment_polling() {
    let mock = MarathonMock::new(false, &[("dep-3", 100)]);
    let url = support::spawn(mock.router()).await;
    let template = write_template(TEMPLATE);
    let template_path = template.to_string_lossy().to_string();
    let (job, _) = support::job(&options(&url, &template_path, &[("waitForDeployment", "false")]));

    let result = MarathonPlugin::default().run(job).await;

    assert!(result.is_success(), "details: {}", result.details);
    assert_eq!(mock.deployments_calls.load(Ordering::SeqCst), 0);
    assert!(!result.outputs.contains_key("marathon.deployments"));

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_stuck_deployment_times_out() {
    let mock = MarathonMock::new(false, &[("dep-ok", 1), ("dep-stuck", u32::MAX)]);
    let url = support::spawn(mock.router()).await;
    let template = write_template(TEMPLATE);
    let template_path = template.to_string_lossy().to_string();
    let (job, sink) = support::job(&options(
        &url,
        &template_path,
        &[("timeout", "1"), ("pollInterval", "100")],
    ));

    let result = MarathonPlugin::default().run(job).await;

    assert_eq!(result.status, Status::Fail);
    assert!(result.details.contains("dep-stuck"));
    assert!(result.details.contains("timed out"));
    assert!(!result.details.contains("dep-ok"));
    assert!(sink.contains("Deployment dep-ok succeeded"));

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_template_without_id_fails() {
    let mock = MarathonMock::new(false, &[]);
    let url = support::spawn(mock.router()).await;
    let template = write_template(r#"{"cpus": 1}"#);
    let template_path = template.to_string_lossy().to_string();
    let (job, _) = support::job(&options(&url, &template_path, &[]));

    let result = MarathonPlugin::default().run(job).await;

    assert_eq!(result.status, Status::Fail);
    assert!(result.details.contains("application id is missing"));
    assert!(mock.created.lock().unwrap().is_none());

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_missing_template_file_fails() {
    let (job, _) = support::job(&options(
        "http://127.0.0.1:9",
        "/nonexistent/marathon.json",
        &[],
    ));

    let result = MarathonPlugin::default().run(job).await;

    assert_eq!(result.status, Status::Fail);
    assert!(result.details.contains("configuration file error"));
}

#[tokio::test]
async fn test_missing_url_fails_before_any_request() {
    let (job, sink) = support::job(&[("configuration", "marathon.json")]);

    let result = MarathonPlugin::default().run(job).await;

    assert_eq!(result.status, Status::Fail);
    assert!(result.details.contains("missing marathon url"));
    assert!(sink.contains("missing marathon url"));
}
