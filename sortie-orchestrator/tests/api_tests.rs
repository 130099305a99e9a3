#![cfg(unix)]

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::Harness;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

use sortie_orchestrator::api::{AppState, create_router};

fn app(harness: &Harness) -> Router {
    create_router(AppState {
        tracker: harness.tracker.clone(),
        inventories: harness.inventories.clone(),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, user: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-User-Id", user)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_execution(body: Value, user: &str) -> Request<Body> {
    json_request("POST", "/executions", body, user)
}

fn delete(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("X-User-Id", user)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::new("exit 0", Duration::from_secs(5), 1);

    let response = app(&harness).oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_submit_and_fetch_execution() {
    let harness = Harness::new("echo pong", Duration::from_secs(5), 1);

    let (status, created) = send(
        app(&harness),
        post_execution(json!({ "hosts": "localhost", "module": "ping" }), "7"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["command"], "ansible localhost -m ping");
    assert_eq!(created["user_id"], 7);

    harness.tracker.wait_idle().await;

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(app(&harness), get(&format!("/executions/{}", id), Some("7"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "success");
    assert_eq!(fetched["output"], "pong");
    assert_eq!(fetched["exit_code"], 0);

    let (status, live) =
        send(app(&harness), get(&format!("/executions/{}/live", id), Some("7"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["status"], "success");
    assert_eq!(live["lines"], json!(["pong"]));
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let harness = Harness::new("exit 0", Duration::from_secs(5), 1);

    let (status, body) = send(
        app(&harness),
        post_execution(json!({ "hosts": "all", "module": "reboot" }), "1"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "unsupported module: reboot" }));

    let (status, body) = send(app(&harness), post_execution(json!({ "module": "ping" }), "1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "hosts is required");

    let (status, body) = send(
        app(&harness),
        post_execution(json!({ "hosts": "--version", "module": "ping" }), "1"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid hosts: --version");

    // nothing was recorded for rejected requests
    let (_, page) = send(app(&harness), get("/executions", Some("1"))).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_missing_or_invalid_principal() {
    let harness = Harness::new("exit 0", Duration::from_secs(5), 1);

    let (status, body) = send(app(&harness), get("/executions", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(app(&harness), get("/executions", Some("admin"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_principals_executions_are_hidden() {
    let harness = Harness::new("exit 0", Duration::from_secs(5), 1);

    let (_, created) = send(
        app(&harness),
        post_execution(json!({ "hosts": "localhost", "module": "ping" }), "1"),
    )
    .await;
    harness.tracker.wait_idle().await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(app(&harness), get(&format!("/executions/{}", id), Some("2"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(&harness),
        get(&format!("/executions/{}", uuid::Uuid::new_v4()), Some("1")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_and_stats() {
    let harness = Harness::new("exit 1", Duration::from_secs(5), 2);

    for _ in 0..3 {
        send(
            app(&harness),
            post_execution(json!({ "hosts": "localhost", "module": "ping" }), "5"),
        )
        .await;
    }
    harness.tracker.wait_idle().await;

    let (status, page) = send(app(&harness), get("/executions?offset=1&limit=1", Some("5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["offset"], 1);
    assert_eq!(page["limit"], 1);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (status, stats) = send(app(&harness), get("/executions/stats", Some("5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({
            "total_executions": 3,
            "successful_executions": 0,
            "failed_executions": 3,
            "running_executions": 0,
            "pending_executions": 0
        })
    );
}

#[tokio::test]
async fn test_modules_and_ansible_status() {
    let harness = Harness::new("echo 'ansible [core 2.17.0]'", Duration::from_secs(5), 1);

    let (status, modules) = send(app(&harness), get("/modules", None)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = modules
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["name"].as_str())
        .collect();
    assert!(names.contains(&"ping"));
    assert!(!names.contains(&"reboot"));

    let (status, check) = send(app(&harness), get("/system/ansible", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["installed"], true);
    assert_eq!(check["version"], "ansible [core 2.17.0]");
    assert!(check.get("error").is_none());
}

#[tokio::test]
async fn test_inventory_crud() {
    let harness = Harness::new("exit 0", Duration::from_secs(5), 1);

    let (status, lab) = send(
        app(&harness),
        json_request(
            "POST",
            "/inventories",
            json!({ "name": "lab", "content": "[lab]\nhost1", "is_default": true }),
            "4",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lab["type"], "static");
    assert_eq!(lab["is_default"], true);
    let id = lab["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app(&harness),
        json_request("POST", "/inventories", json!({ "name": "lab", "content": "x" }), "4"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "inventory name already exists: lab");

    let (status, body) = send(
        app(&harness),
        json_request("POST", "/inventories", json!({ "name": "empty" }), "4"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "content is required");

    let (status, updated) = send(
        app(&harness),
        json_request(
            "PUT",
            &format!("/inventories/{}", id),
            json!({ "name": "lab", "type": "dynamic", "content": "[lab]\nhost2" }),
            "4",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["type"], "dynamic");
    assert_eq!(updated["is_default"], false);

    let (status, _) = send(app(&harness), get("/inventories/default", Some("4"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, page) = send(app(&harness), get("/inventories", Some("4"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["content"], "[lab]\nhost2");

    // another principal sees nothing
    let (status, _) = send(app(&harness), get(&format!("/inventories/{}", id), Some("5"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let response = app(&harness)
        .oneshot(delete(&format!("/inventories/{}", id), "5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app(&harness)
        .oneshot(delete(&format!("/inventories/{}", id), "4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (status, _) = send(app(&harness), get(&format!("/inventories/{}", id), Some("4"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_execution_runs_with_default_inventory() {
    // echoes the inventory file the binary was given
    let harness = Harness::new(
        r#"while [ $# -gt 0 ]; do
  case "$1" in
    -i) cat "$2"; shift ;;
  esac
  shift
done"#,
        Duration::from_secs(5),
        1,
    );

    let (status, _) = send(
        app(&harness),
        json_request(
            "POST",
            "/inventories",
            json!({ "name": "lab", "content": "lab-host-1\n", "is_default": true }),
            "8",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = send(
        app(&harness),
        post_execution(json!({ "hosts": "all", "module": "ping" }), "8"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["inventory"], "lab-host-1\n");

    harness.tracker.wait_idle().await;

    let id = created["id"].as_str().unwrap();
    let (_, fetched) = send(app(&harness), get(&format!("/executions/{}", id), Some("8"))).await;
    assert_eq!(fetched["status"], "success");
    assert_eq!(fetched["output"], "lab-host-1");

    // an unknown inventory id is rejected before anything runs
    let (status, body) = send(
        app(&harness),
        post_execution(
            json!({ "hosts": "all", "module": "ping", "inventory": uuid::Uuid::new_v4().to_string() }),
            "8",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("inventory "));
}
