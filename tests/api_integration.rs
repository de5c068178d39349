mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;
use tessera::{AppState, create_app};

fn server(state: AppState) -> TestServer {
    TestServer::new(create_app(state)).unwrap()
}

#[tokio::test]
async fn test_gallery_route_returns_markup() {
    let temp_dir = TempDir::new().unwrap();
    let server = server(common::app_state(&temp_dir));

    let response = server.get("/gallery?ids=1,2,3&layout=square").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let html = response.text();
    assert!(html.starts_with("<div class=\"mgl-root\""));
    assert!(html.contains("mgl-gallery-skeleton"));
    assert!(html.contains("wp-image-2"));
}

#[tokio::test]
async fn test_gallery_route_errors_stay_inline() {
    let temp_dir = TempDir::new().unwrap();
    let server = server(common::app_state(&temp_dir));

    let response = server.get("/gallery?id=nowhere").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.text(),
        r#"<p class="mgl-error"><b>Gallery:</b> This ID wasn't found in the Gallery Manager. (ID: nowhere).</p>"#
    );
}

#[tokio::test]
async fn test_gallery_route_uses_post_context() {
    let temp_dir = TempDir::new().unwrap();
    let server = server(common::app_state(&temp_dir));

    let response = server.get("/gallery?post_id=500").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("wp-image-4"));
    assert!(!html.contains("post_id"));
}

#[tokio::test]
async fn test_preview_route() {
    let temp_dir = TempDir::new().unwrap();
    let server = server(common::app_state(&temp_dir));
    let ids = common::ids(1..=60);

    let response = server.get(&format!("/api/gallery/preview?ids={}", ids)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["options"]["is_preview"], true);
    assert_eq!(body["options"]["image_ids"].as_array().unwrap().len(), 40);
    assert_eq!(body["images"].as_array().unwrap().len(), 40);
    assert!(body["markup"].as_str().unwrap().starts_with("<div class=\"mgl-root\""));
}

#[tokio::test]
async fn test_preview_route_reports_errors() {
    let temp_dir = TempDir::new().unwrap();
    let server = server(common::app_state(&temp_dir));

    let response = server.get("/api/gallery/preview?id=nowhere").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/api/gallery/preview?ids=1&layout=foo").await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["markup"].as_str().unwrap().contains("mgl-error"));
}

#[tokio::test]
async fn test_listings() {
    let temp_dir = TempDir::new().unwrap();
    let server = server(common::app_state(&temp_dir));

    let response = server.get("/api/galleries").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    // Most recently updated first.
    assert_eq!(body["items"][0]["id"], "city");

    let response = server.get("/api/galleries?order=asc&limit=1").await;
    let body: Value = response.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["id"], "coast");

    let response = server.get("/api/collections").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["items"][0]["galleries"].as_array().unwrap().len(), 2);

    let response = server.get("/api/collections/travel").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["name"], "Travel");

    let response = server.get("/api/collections/unknown").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_tables_are_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let mut manifest = common::manifest();
    manifest.as_object_mut().unwrap().remove("galleries");
    let config = common::write_config(&temp_dir, &manifest);
    let server = server(AppState::from_config(&config).unwrap());

    let response = server.get("/api/galleries").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let response = server.get("/gallery?id=coast").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("mgl-error"));
}
