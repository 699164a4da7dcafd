// HTTP surface tests: the router is driven in-process with tower's oneshot

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use clap::Parser;
use serde_json::{json, Value};
use tower::ServiceExt;

use exam_timer::{create_router, AppState, Config, ManualClock};

const TOKEN: &str = "test-admin-token";

fn app() -> (Router, Arc<AppState>, Arc<ManualClock>) {
    let config = Config::parse_from([
        "exam-timer",
        "--admin-token",
        TOKEN,
        "--heartbeat-ms",
        "600000",
    ]);
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let state = Arc::new(AppState::with_clock(&config, clock.clone()).unwrap());
    (create_router(state.clone()), state, clock)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn catalog_endpoints() {
    let (app, _, _) = app();
    let (status, body) = send(&app, Method::GET, "/exams", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exams"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, Method::GET, "/exams/exam-2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exam"]["durationMs"], 45 * 60 * 1000);

    let (status, body) = send(&app, Method::GET, "/exams/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Exam unknown not found");
}

#[tokio::test]
async fn reading_timer_seeds_catalog_duration() {
    let (app, _, _) = app();
    let (status, body) = send(&app, Method::GET, "/exams/exam-1/timer", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["examId"], "exam-1");
    assert_eq!(body["running"], false);
    assert_eq!(body["durationMs"], 3_600_000);
    assert_eq!(body["remainingMs"], 3_600_000);
    assert_eq!(body["serverNowMs"], 1_700_000_000_000i64);

    // exams outside the catalog still get a default timer
    let (status, body) = send(&app, Method::GET, "/exams/ad-hoc/timer", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["durationMs"], 0);
}

#[tokio::test]
async fn mutations_require_admin_token() {
    let (app, state, _) = app();

    let (status, body) = send(&app, Method::POST, "/exams/exam-1/timer/start", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, Method::POST, "/exams/exam-1/timer/start", Some("wrong"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for path in ["pause", "reset", "adjust"] {
        let uri = format!("/exams/exam-1/timer/{}", path);
        let (status, _) = send(&app, Method::POST, &uri, None, Some(json!({ "deltaMs": 1000 }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} must be privileged", path);
    }

    assert!(!state.engine.ensure("exam-1", None).is_running());
}

#[tokio::test]
async fn start_pause_resume_over_http() {
    let (app, _, clock) = app();

    let (status, body) = send(&app, Method::POST, "/exams/exam-1/timer/start", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["running"], true);
    assert_eq!(body["timer"]["remainingMs"], 3_600_000);

    clock.advance(10_000);
    let (_, body) = send(&app, Method::POST, "/exams/exam-1/timer/pause", Some(TOKEN), None).await;
    assert_eq!(body["timer"]["running"], false);
    assert_eq!(body["timer"]["pausedRemainingMs"], 3_590_000);

    clock.advance(60_000);
    let (_, body) = send(&app, Method::POST, "/exams/exam-1/timer/start", Some(TOKEN), None).await;
    assert_eq!(body["timer"]["running"], true);
    assert_eq!(body["timer"]["remainingMs"], 3_590_000);
}

#[tokio::test]
async fn start_with_explicit_duration() {
    let (app, _, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/exams/exam-1/timer/start",
        Some(TOKEN),
        Some(json!({ "durationMs": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["durationMs"], 5000);
    assert_eq!(body["timer"]["remainingMs"], 5000);
}

#[tokio::test]
async fn adjust_and_reset_over_http() {
    let (app, _, _) = app();

    let (status, body) = send(&app, Method::POST, "/exams/exam-2/timer/adjust", Some(TOKEN), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request: deltaMs is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/exams/exam-2/timer/adjust",
        Some(TOKEN),
        Some(json!({ "deltaMs": 30000, "userId": "student-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["perUserDeltaMs"]["student-1"], 30000);
    assert_eq!(body["timer"]["globalDeltaMs"], 0);

    let (_, body) = send(
        &app,
        Method::POST,
        "/exams/exam-2/timer/adjust",
        Some(TOKEN),
        Some(json!({ "deltaMs": -60000 })),
    )
    .await;
    assert_eq!(body["timer"]["globalDeltaMs"], -60000);

    let (status, body) = send(
        &app,
        Method::POST,
        "/exams/exam-2/timer/reset",
        Some(TOKEN),
        Some(json!({ "durationMs": 120000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["remainingMs"], 120000);
    assert_eq!(body["timer"]["globalDeltaMs"], 0);
    assert!(body["timer"]["perUserDeltaMs"].as_object().unwrap().is_empty());
}
