//! HTTP surface tests: admission, listing, cancellation, health, and the
//! end-to-end add → tick → published flow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use baseone::kernel::{
    AppDeps, PublishError, Publisher, SchedulerLoop, TaskExecutor,
};
use baseone::server::build_app;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

struct StubPublisher;

#[async_trait]
impl Publisher for StubPublisher {
    async fn publish(
        &self,
        destination: &str,
        _title: &str,
        _content: &str,
    ) -> Result<String, PublishError> {
        Ok(format!("http://x/{}", destination))
    }
}

struct BrokenPublisher;

#[async_trait]
impl Publisher for BrokenPublisher {
    async fn publish(&self, _: &str, _: &str, _: &str) -> Result<String, PublishError> {
        Err(PublishError::new("connection reset by peer"))
    }
}

async fn test_deps(publisher: Arc<dyn Publisher>) -> Arc<AppDeps> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Arc::new(AppDeps::new(pool, publisher))
}

async fn test_app() -> (Router, Arc<AppDeps>) {
    let deps = test_deps(Arc::new(StubPublisher)).await;
    (build_app(deps.clone()), deps)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn add_request(scheduled_at: &str) -> Request<Body> {
    post_json(
        "/api/tasks",
        json!({
            "destination": "B1",
            "title": "Hello",
            "content": "<p>x</p>",
            "scheduled_at": scheduled_at,
        }),
    )
}

#[tokio::test]
async fn add_then_list_shows_pending_task() {
    let (app, _deps) = test_app().await;

    let response = app
        .clone()
        .oneshot(add_request("2030-01-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    let id = body["id"].as_i64().unwrap();

    let response = app.oneshot(get("/api/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_i64().unwrap(), id);
    assert_eq!(items[0]["status"], json!("pending"));
    assert_eq!(items[0]["destination"], json!("B1"));
}

#[tokio::test]
async fn add_rejects_unparseable_timestamp() {
    let (app, deps) = test_app().await;

    let response = app.clone().oneshot(add_request("not-a-date")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("scheduled_at"));

    // Nothing was created.
    assert!(deps.store.list(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_rejects_blank_required_field() {
    let (app, _deps) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/tasks",
            json!({
                "destination": "",
                "title": "Hello",
                "content": "<p>x</p>",
                "scheduled_at": "2030-01-01T00:00:00Z",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("destination"));
}

#[tokio::test]
async fn cancel_pending_task_then_cancel_again() {
    let (app, _deps) = test_app().await;

    let response = app
        .clone()
        .oneshot(add_request("2030-01-01T00:00:00Z"))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/tasks/{id}/cancel"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], json!(true));

    let response = app.clone().oneshot(get("/api/tasks")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["items"][0]["status"], json!("canceled"));

    // Not pending anymore; the second cancel is a no-op signal, not an error.
    let response = app
        .oneshot(post_json(&format!("/api/tasks/{id}/cancel"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], json!(false));
}

#[tokio::test]
async fn cancel_unknown_task_reports_false() {
    let (app, _deps) = test_app().await;

    let response = app
        .oneshot(post_json("/api/tasks/999/cancel", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], json!(false));
}

#[tokio::test]
async fn due_task_is_published_on_next_tick() {
    let (app, deps) = test_app().await;

    let response = app
        .clone()
        .oneshot(add_request("2020-01-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let executor = TaskExecutor::new(
        deps.store.clone(),
        deps.publisher.clone(),
        Duration::from_secs(5),
    );
    let scheduler = SchedulerLoop::new(deps.store.clone(), executor);
    assert_eq!(scheduler.run_once().await.unwrap(), 1);

    let response = app.oneshot(get("/api/tasks")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["items"][0]["status"], json!("succeeded"));
    assert_eq!(body["items"][0]["result_url"], json!("http://x/B1"));
    assert_eq!(body["items"][0]["error"], json!(null));
}

#[tokio::test]
async fn failed_publish_is_visible_in_listing() {
    let deps = test_deps(Arc::new(BrokenPublisher)).await;
    let app = build_app(deps.clone());

    app.clone()
        .oneshot(add_request("2020-01-01T00:00:00Z"))
        .await
        .unwrap();

    let executor = TaskExecutor::new(
        deps.store.clone(),
        deps.publisher.clone(),
        Duration::from_secs(5),
    );
    let scheduler = SchedulerLoop::new(deps.store.clone(), executor);
    scheduler.run_once().await.unwrap();

    let response = app.oneshot(get("/api/tasks")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["items"][0]["status"], json!("failed"));
    assert!(body["items"][0]["error"]
        .as_str()
        .unwrap()
        .contains("connection reset"));
    assert_eq!(body["items"][0]["result_url"], json!(null));
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _deps) = test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["service"], json!("baseone-backend"));
    assert_eq!(body["database"]["status"], json!("ok"));
}
