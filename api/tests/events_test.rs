mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use futures::StreamExt;
use helpers::make_test_app;
use serde_json::json;
use serial_test::serial;
use tempfile::tempdir;
use tokio::time::{Duration, timeout};
use tower::ServiceExt;
use util::config::AppConfig;

#[tokio::test]
#[serial]
async fn events_stream_is_public_and_sse_typed() {
    let (app, app_state) = make_test_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/events")
        .body(Body::empty())
        .unwrap();

    // Do not consume the body; the stream never ends.
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));

    // The handler registered a subscriber for this connection.
    assert_eq!(app_state.broadcaster().subscriber_count(), 1);
}

#[tokio::test]
#[serial]
async fn events_stream_sends_hello_then_published_payloads() {
    let (app, app_state) = make_test_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/events")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut frames = response.into_body().into_data_stream();

    // The synthetic hello arrives before anything is published.
    let first = timeout(Duration::from_secs(1), frames.next())
        .await
        .expect("Timed out waiting for the hello frame")
        .expect("Stream ended before the hello frame")
        .unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.contains("event: hello"), "got frame: {first}");
    assert!(first.contains("data: connected"), "got frame: {first}");

    // The connection's subscriber was registered during the handler, so a
    // publish now must be forwarded as a data frame.
    app_state
        .broadcaster()
        .publish(&json!({"type": "PING"}))
        .unwrap();

    let second = timeout(Duration::from_secs(1), frames.next())
        .await
        .expect("Timed out waiting for the published event")
        .expect("Stream ended before the published event")
        .unwrap();
    let second = String::from_utf8(second.to_vec()).unwrap();
    assert!(
        second.contains(r#"data: {"type":"PING"}"#),
        "got frame: {second}"
    );
    assert!(second.ends_with("\n\n"), "got frame: {second:?}");
}

#[tokio::test]
#[serial]
async fn uploads_serves_stored_files_with_guessed_type() {
    let (app, _app_state) = make_test_app().await;
    let dir = tempdir().unwrap();
    AppConfig::set_upload_root(dir.path().to_str().unwrap());
    std::fs::write(dir.path().join("PKG0001_1_ab12.jpg"), b"fake-jpeg").unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/uploads/PKG0001_1_ab12.jpg")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"fake-jpeg");
}

#[tokio::test]
#[serial]
async fn uploads_rejects_missing_and_traversal_names() {
    let (app, _app_state) = make_test_app().await;
    let dir = tempdir().unwrap();
    AppConfig::set_upload_root(dir.path().to_str().unwrap());

    let req = Request::builder()
        .method("GET")
        .uri("/uploads/nope.jpg")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let req = Request::builder()
        .method("GET")
        .uri("/uploads/..%2F..%2Fetc%2Fpasswd")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
