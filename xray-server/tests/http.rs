use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use xray_server::api::{AppState, create_router};
use xray_server::repository::MemoryTraceStore;

fn app() -> Router {
    let state = AppState::new(Arc::new(MemoryTraceStore::new()));
    create_router(state, Duration::from_secs(5))
}

fn snapshot(pipeline_id: &str) -> Value {
    json!({
        "pipeline_id": pipeline_id,
        "pipeline_type": "competitor_selection",
        "start_time": "2025-03-01T10:00:00Z",
        "metadata": { "product": "phone case" },
        "steps": [{
            "step_name": "keyword_generation",
            "inputs": { "title": "Phone Case" },
            "outputs": { "keywords": ["phone", "case"] },
            "reasoning": "Generated keywords from title",
            "timestamp": "2025-03-01T10:00:01Z",
            "execution_time_ms": 6000.0
        }],
        "candidates": [{
            "step_name": "price_filter",
            "input_count": 1000,
            "output_count": 5,
            "filters_applied": ["price_range"],
            "timestamp": "2025-03-01T10:00:02Z"
        }]
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, value)
}

#[tokio::test]
async fn root_reports_banner_and_health() {
    let app = app();

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "X-Ray API is running");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "X-Ray API is running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn create_then_fetch_pipeline() {
    let app = app();

    let (status, created) = send(&app, "POST", "/api/v1/pipelines", Some(snapshot("http-1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["pipeline_id"], "http-1");
    assert_eq!(created["status"], "running");

    let (status, fetched) = send(&app, "GET", "/api/v1/pipelines/http-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["steps"].as_array().unwrap().len(), 1);
    assert_eq!(fetched["candidates"][0]["elimination_rate"], 99.5);
    assert_eq!(fetched["candidates"][0]["input_count"], 1000);
}

#[tokio::test]
async fn duplicate_create_is_conflict_and_unknown_is_not_found() {
    let app = app();

    send(&app, "POST", "/api/v1/pipelines", Some(snapshot("dup"))).await;
    let (status, body) = send(&app, "POST", "/api/v1/pipelines", Some(snapshot("dup"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("dup"));

    let (status, _) = send(&app, "GET", "/api/v1/pipelines/nonexistent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/pipelines/nonexistent",
        Some(snapshot("nonexistent")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn merge_twice_keeps_counts_and_completes() {
    let app = app();
    send(&app, "POST", "/api/v1/pipelines", Some(snapshot("merge-1"))).await;

    let mut full = snapshot("merge-1");
    full["status"] = json!("completed");
    full["end_time"] = json!("2025-03-01T10:00:30Z");
    full["final_result"] = json!({ "competitor": "B0C1234" });
    full["steps"].as_array_mut().unwrap().push(json!({
        "step_name": "ranking",
        "reasoning": "Ranked by relevance",
        "timestamp": "2025-03-01T10:00:03Z",
        "execution_time_ms": 40.0
    }));

    for _ in 0..2 {
        let (status, merged) = send(&app, "PUT", "/api/v1/pipelines/merge-1", Some(full.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(merged["steps"].as_array().unwrap().len(), 2);
        assert_eq!(merged["candidates"].as_array().unwrap().len(), 1);
        assert_eq!(merged["status"], "completed");
    }
}

#[tokio::test]
async fn invalid_snapshot_is_bad_request() {
    let app = app();

    let mut bad = snapshot("bad-1");
    bad["status"] = json!("completed");
    let (status, body) = send(&app, "POST", "/api/v1/pipelines", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("end_time"));
}

#[tokio::test]
async fn incomplete_body_is_bad_request_with_error_body() {
    let app = app();

    let mut bad = snapshot("incomplete-1");
    bad["steps"] = json!([{ "step_name": "s", "timestamp": "2025-03-01T10:00:01Z" }]);
    let (status, body) = send(&app, "POST", "/api/v1/pipelines", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("reasoning"));

    let (status, _) = send(&app, "GET", "/api/v1/pipelines/incomplete-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unparseable_query_is_bad_request_with_error_body() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/v1/pipelines/search?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/candidates/high-elimination?min_rate=lots",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn merge_with_mismatched_id_is_rejected_and_changes_nothing() {
    let app = app();
    send(&app, "POST", "/api/v1/pipelines", Some(snapshot("a"))).await;

    let mut other = snapshot("b");
    other["status"] = json!("failed");
    other["end_time"] = json!("2025-03-01T10:00:30Z");
    let (status, body) = send(&app, "PUT", "/api/v1/pipelines/a", Some(other)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not match"));

    let (status, stored) = send(&app, "GET", "/api/v1/pipelines/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "running");
    assert_eq!(stored["steps"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_and_high_elimination_endpoints() {
    let app = app();
    send(&app, "POST", "/api/v1/pipelines", Some(snapshot("search-1"))).await;

    let (status, found) = send(
        &app,
        "GET",
        "/api/v1/pipelines/search?pipeline_type=competitor_selection&status=running&step_name=keyword_generation",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, none) = send(&app, "GET", "/api/v1/pipelines/search?status=failed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(none.as_array().unwrap().is_empty());

    let (status, hits) = send(&app, "GET", "/api/v1/candidates/high-elimination", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["elimination_rate"], 99.5);

    let (status, hits) = send(
        &app,
        "GET",
        "/api/v1/candidates/high-elimination?min_rate=99.9",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(hits.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn analyze_and_debug_endpoints() {
    let app = app();
    send(&app, "POST", "/api/v1/pipelines", Some(snapshot("debug-1"))).await;

    let (status, stats) = send(&app, "GET", "/api/v1/steps/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats[0]["step_name"], "keyword_generation");
    assert_eq!(stats[0]["total_executions"], 1);

    let (status, report) = send(&app, "GET", "/api/v1/debug/pipeline/debug-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_steps"], 1);
    assert_eq!(
        report["execution_summary"][0]["potential_issues"],
        json!(["long_execution_time"])
    );
    assert_eq!(
        report["filtering_analysis"][0]["potential_issues"],
        json!(["elimination_rate_too_high"])
    );
}

#[tokio::test]
async fn delete_returns_no_content_then_not_found() {
    let app = app();
    send(&app, "POST", "/api/v1/pipelines", Some(snapshot("delete-1"))).await;

    let (status, _) = send(&app, "DELETE", "/api/v1/pipelines/delete-1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/api/v1/pipelines/delete-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
