//! HTTP surface tests driving the router in-process.

use std::sync::Arc;

use account_sync::models::trusted_account::ScopeKind;
use account_sync::server::{AppState, create_app};
use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    FakeTransport, TEST_DOMAIN, create_trusted_account, new_trusted_account, seed_catalog,
    setup_test_db_arc, test_services,
};

async fn app() -> Result<(Router, Arc<sea_orm::DatabaseConnection>)> {
    let db = setup_test_db_arc().await?;
    seed_catalog(&db).await?;
    let services = test_services(db.clone(), Arc::new(FakeTransport::returning(Vec::new())));
    Ok((create_app(AppState::from(&services)), db))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-Domain-Id", TEST_DOMAIN)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Domain-Id", TEST_DOMAIN)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn root_and_health_respond() -> Result<()> {
    let (app, _db) = app().await?;

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "account-sync");

    let (status, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_job_routes() -> Result<()> {
    let (app, _db) = app().await?;

    let (status, body) = send(&app, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/jobs"].is_object());
    assert!(body["paths"]["/schedule/tick"].is_object());
    Ok(())
}

#[tokio::test]
async fn trigger_sync_then_inspect_and_cancel() -> Result<()> {
    let (app, db) = app().await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let (status, job) = send(
        &app,
        post_json(
            &format!("/trusted-accounts/{}/sync", account.id),
            json!({ "options": { "full": true } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["status"], "PENDING");
    assert_eq!(job["workspace_id"], "*");
    let job_id = job["job_id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, get("/jobs?status=PENDING")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["jobs"][0]["job_id"], job_id.as_str());

    let (status, fetched) = send(&app, get(&format!("/jobs/{job_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["options"], json!({ "full": true }));

    let (status, canceled) =
        send(&app, post_json(&format!("/jobs/{job_id}/cancel"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["status"], "CANCELED");

    let (status, stats) = send(&app, get("/jobs/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["by_status"]["CANCELED"], 1);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/jobs/{job_id}"))
        .header("X-Domain-Id", TEST_DOMAIN)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, error) = send(&app, get(&format!("/jobs/{job_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn requests_without_domain_header_are_rejected() -> Result<()> {
    let (app, _db) = app().await?;

    let request = Request::builder().uri("/jobs").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    Ok(())
}

#[tokio::test]
async fn sync_for_unknown_account_is_not_found() -> Result<()> {
    let (app, _db) = app().await?;

    let (status, body) = send(
        &app,
        post_json(&format!("/trusted-accounts/{}/sync", Uuid::new_v4()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn schedule_tick_validates_and_reports() -> Result<()> {
    let (app, db) = app().await?;
    create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let (status, _) = send(&app, post_json("/schedule/tick", json!({ "current_hour": 24 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) =
        send(&app, post_json("/schedule/tick", json!({ "current_hour": 15 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["hour"], 15);
    assert_eq!(report["due"], 1);
    assert_eq!(report["created"], 1);
    Ok(())
}
