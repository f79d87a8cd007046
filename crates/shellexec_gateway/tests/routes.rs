//! Integration tests for the gateway routes, driven through the router
//! without binding a socket.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use shellexec_core::{
    AuditLog, ConfigStore, MemoryConfigStore, ScriptConfiguration, ScriptStore,
};
use shellexec_gateway::{GatewayServer, CONFIGURATION_PATH, EXECUTE_PATH};
use shellexec_os::{ExecutionEngine, LocalRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

fn script_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("JellyfinShellExecutor/script.sh")
}

fn build_app(dir: &tempfile::TempDir, script: &str, interpreter: &str, token: Option<&str>) -> Router {
    build_app_with_store(dir, script, interpreter, token, Arc::new(MemoryConfigStore::new()))
}

fn build_app_with_store(
    dir: &tempfile::TempDir,
    script: &str,
    interpreter: &str,
    token: Option<&str>,
    config_store: Arc<dyn ConfigStore>,
) -> Router {
    let store = ScriptStore::new(
        script_path(dir),
        ScriptConfiguration {
            script_content: script.to_string(),
        },
        config_store,
        AuditLog::new(dir.path().join("executor.log")),
    );
    let engine = Arc::new(ExecutionEngine::new(
        store,
        Arc::new(LocalRunner::new(interpreter, None)),
    ));
    GatewayServer::new(engine, token.map(String::from), "127.0.0.1", 0).router()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = build_app(&dir, "exit 0", "/bin/sh", Some(TOKEN));

    let response = app
        .oneshot(request(Method::GET, "/health", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn execute_requires_token() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = build_app(&dir, "exit 0", "/bin/sh", Some(TOKEN));

    let missing = app
        .clone()
        .oneshot(request(Method::POST, EXECUTE_PATH, None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some("nope"), Body::empty()))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    // Rejected requests never reach the engine
    assert!(!script_path(&dir).exists());
}

#[tokio::test]
async fn execute_rejected_without_configured_token() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = build_app(&dir, "exit 0", "/bin/sh", None);

    let response = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[cfg(unix)]
#[tokio::test]
async fn execute_reports_success() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = build_app(&dir, "echo hello\n", "/bin/sh", Some(TOKEN));

    let response = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Script executed successfully");
    assert_eq!(json["exitCode"], 0);
}

#[tokio::test]
async fn execute_spawn_failure_is_200_with_failure_body() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = build_app(&dir, "echo hello\n", "/nonexistent/shell", Some(TOKEN));

    let response = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("/nonexistent/shell"));
    assert!(json.get("exitCode").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn configuration_update_then_execute() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = build_app(&dir, "echo before\n", "/bin/sh", Some(TOKEN));

    let update = serde_json::json!({ "scriptContent": "exit 3" }).to_string();
    let response = app
        .clone()
        .oneshot(request(Method::POST, CONFIGURATION_PATH, Some(TOKEN), Body::from(update)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let response = app
        .clone()
        .oneshot(request(Method::GET, CONFIGURATION_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["scriptContent"], "exit 3");

    let response = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    let json = body_json(response).await;
    // Non-zero exit is still a successful execution
    assert_eq!(json["success"], true);
    assert_eq!(json["exitCode"], 3);
}

#[tokio::test]
async fn configuration_save_failure_is_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("JellyfinShellExecutor"), "blocks the directory").unwrap();
    let app = build_app(&dir, "echo hi\n", "/bin/sh", Some(TOKEN));

    let update = serde_json::json!({ "scriptContent": "echo new" }).to_string();
    let response = app
        .oneshot(request(Method::POST, CONFIGURATION_PATH, Some(TOKEN), Body::from(update)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("failed to create script directory"));
}

#[tokio::test]
async fn execute_sync_failure_is_reported_and_nothing_runs() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("JellyfinShellExecutor"), "blocks the directory").unwrap();
    let app = build_app(&dir, "echo hi\n", "/bin/sh", Some(TOKEN));

    let response = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("failed to create script directory"));
    assert!(json.get("exitCode").is_none());

    let audit = std::fs::read_to_string(dir.path().join("executor.log")).unwrap();
    assert!(!audit.contains("EXECUTING SCRIPT"));
}

/// Removes the script file whenever the configuration is persisted, so the
/// file is gone by the time the engine looks for it.
struct VanishingScriptStore {
    script: PathBuf,
}

#[async_trait::async_trait]
impl ConfigStore for VanishingScriptStore {
    async fn load(&self) -> anyhow::Result<Option<ScriptConfiguration>> {
        Ok(None)
    }

    async fn persist(&self, _config: &ScriptConfiguration) -> anyhow::Result<()> {
        let _ = std::fs::remove_file(&self.script);
        Ok(())
    }
}

#[tokio::test]
async fn execute_missing_script_is_a_successful_no_op() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_store = Arc::new(VanishingScriptStore {
        script: script_path(&dir),
    });
    let app = build_app_with_store(&dir, "echo hi\n", "/bin/sh", Some(TOKEN), config_store);

    let response = app
        .oneshot(request(Method::POST, EXECUTE_PATH, Some(TOKEN), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["message"].as_str().unwrap().contains("not found"));
    assert!(json.get("exitCode").is_none());
}
