mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use db::models::package::Model as PackageModel;
use db::models::user::{Model as UserModel, Role};
use helpers::{auth_header, make_test_app, read_json};
use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;
use tower::ServiceExt;
use util::config::AppConfig;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

async fn seed_driver(db: &sea_orm::DatabaseConnection, username: &str) -> UserModel {
    UserModel::create(db, username, &format!("Driver {username}"), "pw1234", Role::Driver)
        .await
        .unwrap()
}

/// Points the upload root at a fresh temp directory for one test.
fn temp_upload_root() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp upload dir");
    AppConfig::set_upload_root(dir.path().to_str().unwrap());
    dir
}

/// Builds a `multipart/form-data` body with text fields and `images` parts.
fn multipart_body(fields: &[(&str, &str)], images: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (filename, bytes) in images {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn close_request(uri: &str, driver: &UserModel, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header(driver))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
#[serial]
async fn reasons_returns_the_fixed_list() {
    let (app, app_state) = make_test_app().await;
    let driver = seed_driver(app_state.db(), "d1").await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/driver/reasons")
        .header(header::AUTHORIZATION, auth_header(&driver))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    let reasons = json["data"].as_array().unwrap();
    assert_eq!(reasons.len(), 8);
    assert!(reasons.contains(&json!("Recipient absent")));
}

#[tokio::test]
#[serial]
async fn my_packages_only_returns_own_assignments() {
    let (app, app_state) = make_test_app().await;
    let db = app_state.db();
    let d1 = seed_driver(db, "d1").await;
    let d2 = seed_driver(db, "d2").await;
    PackageModel::create(db, "PKG0001", "Mine", "Addr", "", d1.id).await.unwrap();
    PackageModel::create(db, "PKG0002", "Theirs", "Addr", "", d2.id).await.unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/api/driver/packages")
        .header(header::AUTHORIZATION, auth_header(&d1))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    let packages = json["data"].as_array().unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0]["code"], "PKG0001");
}

#[tokio::test]
#[serial]
async fn package_detail_hides_other_drivers_packages() {
    let (app, app_state) = make_test_app().await;
    let db = app_state.db();
    let d1 = seed_driver(db, "d1").await;
    let d2 = seed_driver(db, "d2").await;
    let theirs = PackageModel::create(db, "PKG0001", "Theirs", "Addr", "", d2.id)
        .await
        .unwrap();

    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/driver/packages/{}", theirs.id))
        .header(header::AUTHORIZATION, auth_header(&d1))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn update_location_stores_position_and_broadcasts() {
    let (app, app_state) = make_test_app().await;
    let driver = seed_driver(app_state.db(), "d1").await;

    // Subscribe before publishing so the event must reach us.
    let mut subscriber = app_state.broadcaster().register();

    let req = Request::builder()
        .method("POST")
        .uri("/api/driver/location")
        .header(header::AUTHORIZATION, auth_header(&driver))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"lat": -12.05, "lng": -77.03}).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["ok"], true);

    let reloaded = UserModel::find_by_username(app_state.db(), "d1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.last_lat, Some(-12.05));
    assert_eq!(reloaded.last_lng, Some(-77.03));

    let payload = subscriber.try_recv().expect("Expected a broadcast event");
    let event: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(event["type"], "DRIVER_LOCATION");
    assert_eq!(event["driver_id"], driver.id);
    assert_eq!(event["lat"], -12.05);
    assert_eq!(event["username"], "d1");
}

#[tokio::test]
#[serial]
async fn update_location_rejects_out_of_range_coordinates() {
    let (app, app_state) = make_test_app().await;
    let driver = seed_driver(app_state.db(), "d1").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/driver/location")
        .header(header::AUTHORIZATION, auth_header(&driver))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"lat": 95.0, "lng": 0.0}).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn close_delivered_stores_proofs_and_broadcasts() {
    let (app, app_state) = make_test_app().await;
    let _upload_dir = temp_upload_root();
    let db = app_state.db();
    let driver = seed_driver(db, "d1").await;
    let pkg = PackageModel::create(db, "PKG0001", "Alice", "1 Main St", "", driver.id)
        .await
        .unwrap();

    let mut subscriber = app_state.broadcaster().register();

    let body = multipart_body(
        &[("pod_notes", "Left with the doorman"), ("lat", "-12.05"), ("lng", "-77.03")],
        &[("front.jpg", b"fake-jpeg-1"), ("door.jpg", b"fake-jpeg-2")],
    );
    let uri = format!("/api/driver/packages/{}/close_delivered", pkg.id);
    let response = app
        .clone()
        .oneshot(close_request(&uri, &driver, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["status"], "DELIVERED");
    assert_eq!(json["data"]["pod_notes"], "Left with the doorman");
    assert!(json["data"]["closed_at"].as_str().is_some());
    let proofs = json["data"]["proofs"].as_array().unwrap();
    assert_eq!(proofs.len(), 2);
    assert!(proofs[0]["url"].as_str().unwrap().starts_with("/uploads/"));

    // Both photos landed in the upload root.
    let stored = std::fs::read_dir(_upload_dir.path()).unwrap().count();
    assert_eq!(stored, 2);

    let payload = subscriber.try_recv().expect("Expected a broadcast event");
    let event: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(event["type"], "PACKAGE_CLOSED");
    assert_eq!(event["code"], "PKG0001");
    assert_eq!(event["status"], "DELIVERED");

    // A second close attempt must be rejected.
    let body = multipart_body(
        &[("pod_notes", "again")],
        &[("a.jpg", b"x"), ("b.jpg", b"y")],
    );
    let response = app.oneshot(close_request(&uri, &driver, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["message"], "Package already closed");
}

#[tokio::test]
#[serial]
async fn close_requires_notes_and_two_photos() {
    let (app, app_state) = make_test_app().await;
    let _upload_dir = temp_upload_root();
    let db = app_state.db();
    let driver = seed_driver(db, "d1").await;
    let pkg = PackageModel::create(db, "PKG0001", "Alice", "1 Main St", "", driver.id)
        .await
        .unwrap();
    let uri = format!("/api/driver/packages/{}/close_delivered", pkg.id);

    // Blank notes.
    let body = multipart_body(&[("pod_notes", "   ")], &[("a.jpg", b"x"), ("b.jpg", b"y")]);
    let response = app
        .clone()
        .oneshot(close_request(&uri, &driver, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["message"], "Proof notes are required");

    // Only one photo.
    let body = multipart_body(&[("pod_notes", "ok")], &[("a.jpg", b"x")]);
    let response = app.oneshot(close_request(&uri, &driver, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["message"], "At least 2 photos are required");
}

#[tokio::test]
#[serial]
async fn close_not_delivered_validates_the_reason() {
    let (app, app_state) = make_test_app().await;
    let _upload_dir = temp_upload_root();
    let db = app_state.db();
    let driver = seed_driver(db, "d1").await;
    let pkg = PackageModel::create(db, "PKG0001", "Alice", "1 Main St", "", driver.id)
        .await
        .unwrap();
    let uri = format!("/api/driver/packages/{}/close_not_delivered", pkg.id);

    let body = multipart_body(
        &[("pod_notes", "nobody home"), ("reason", "Dog ate it")],
        &[("a.jpg", b"x"), ("b.jpg", b"y")],
    );
    let response = app
        .clone()
        .oneshot(close_request(&uri, &driver, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["message"], "Invalid non-delivery reason");

    let body = multipart_body(
        &[("pod_notes", "nobody home"), ("reason", "Recipient absent")],
        &[("a.jpg", b"x"), ("b.jpg", b"y")],
    );
    let response = app.oneshot(close_request(&uri, &driver, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["status"], "NOT_DELIVERED");
    assert_eq!(json["data"]["non_delivery_reason"], "Recipient absent");
}

#[tokio::test]
#[serial]
async fn close_rejects_packages_owned_by_another_driver() {
    let (app, app_state) = make_test_app().await;
    let _upload_dir = temp_upload_root();
    let db = app_state.db();
    let d1 = seed_driver(db, "d1").await;
    let d2 = seed_driver(db, "d2").await;
    let theirs = PackageModel::create(db, "PKG0001", "Alice", "1 Main St", "", d2.id)
        .await
        .unwrap();

    let body = multipart_body(&[("pod_notes", "ok")], &[("a.jpg", b"x"), ("b.jpg", b"y")]);
    let uri = format!("/api/driver/packages/{}/close_delivered", theirs.id);
    let response = app.oneshot(close_request(&uri, &d1, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn progress_counts_closed_over_total() {
    let (app, app_state) = make_test_app().await;
    let _upload_dir = temp_upload_root();
    let db = app_state.db();
    let driver = seed_driver(db, "d1").await;
    let pkg = PackageModel::create(db, "PKG0001", "Alice", "1 Main St", "", driver.id)
        .await
        .unwrap();
    PackageModel::create(db, "PKG0002", "Bob", "2 Main St", "", driver.id)
        .await
        .unwrap();

    let body = multipart_body(&[("pod_notes", "ok")], &[("a.jpg", b"x"), ("b.jpg", b"y")]);
    let uri = format!("/api/driver/packages/{}/close_delivered", pkg.id);
    let response = app
        .clone()
        .oneshot(close_request(&uri, &driver, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let req = Request::builder()
        .method("GET")
        .uri("/api/driver/progress")
        .header(header::AUTHORIZATION, auth_header(&driver))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["closed"], 1);
    assert_eq!(json["data"]["total"], 2);
    assert_eq!(json["data"]["fraction"], "1/2");
}
