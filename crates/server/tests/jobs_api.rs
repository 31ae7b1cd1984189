//! Job submission and polling through the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::TestFixture;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let response = fixture.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_formats_for_jpg_is_fixed_allow_list() {
    let fixture = TestFixture::new();
    let response = fixture.get("/formats?file_ext=.jpg").await;
    assert_eq!(response.status, StatusCode::OK);

    let formats: Vec<&str> = response.body["formats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(formats, ["PNG", "JPG", "JPEG", "BMP", "GIF", "TIFF", "PDF"]);
}

#[tokio::test]
async fn test_formats_from_file_path() {
    let fixture = TestFixture::new();
    let response = fixture.get("/formats?file_path=/music/track.mp3").await;
    assert_eq!(response.status, StatusCode::OK);
    let formats = response.body["formats"].as_array().unwrap();
    assert_eq!(formats.len(), 4);
    assert_eq!(formats[0], "MP3");
}

#[tokio::test]
async fn test_formats_requires_parameter() {
    let fixture = TestFixture::new();
    let response = fixture.get("/formats").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].as_str().unwrap().contains("file_"));
}

#[tokio::test]
async fn test_formats_unknown_extension_is_empty() {
    let fixture = TestFixture::new();
    let response = fixture.get("/formats?file_ext=xyz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["formats"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_convert_rejects_empty_file_list() {
    let fixture = TestFixture::new();
    let response = fixture
        .post(
            "/convert",
            json!({
                "files": [],
                "output_format": "pdf",
                "output_dir": fixture.output_dir(),
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_convert_mixed_batch_to_completion() {
    let fixture = TestFixture::new();
    let response = fixture
        .post(
            "/convert",
            json!({
                "files": ["/in/a.png", "/in/b.unsupported"],
                "output_format": "pdf",
                "output_dir": fixture.output_dir(),
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let job_id = response.body["job_id"].as_str().unwrap().to_string();
    assert!(!job_id.is_empty());

    let job = fixture.wait_for_job(&job_id).await;
    assert_eq!(job["total"], 2);
    assert_eq!(job["processed"], 2);
    assert_eq!(job["success"], 1);
    assert_eq!(job["failed"], 1);
    assert_eq!(job["done"], true);

    // The unsupported file never reached a converter.
    assert_eq!(fixture.converter.invocation_count(), 1);

    // Both outcomes were recorded.
    let response = fixture.get("/history/recent?limit=10").await;
    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);

    let failed_item = items
        .iter()
        .find(|i| i["input_file"] == "/in/b.unsupported")
        .unwrap();
    assert_eq!(failed_item["success"], false);
    assert!(!failed_item["error_message"].as_str().unwrap().is_empty());

    let ok_item = items.iter().find(|i| i["input_file"] == "/in/a.png").unwrap();
    assert_eq!(ok_item["success"], true);
    assert_eq!(ok_item["output_format"], "pdf");
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let fixture = TestFixture::new();
    let response = fixture.get("/jobs/not-a-real-job-id").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("not-a-real-job-id"));
}

#[tokio::test]
async fn test_open_folder_rejects_non_directory() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/open_folder", json!({"path": "/definitely/not/a/dir"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let fixture = TestFixture::new();
    let response = fixture
        .post(
            "/convert",
            json!({
                "files": ["/in/a.png"],
                "output_format": "jpg",
                "output_dir": fixture.output_dir(),
            }),
        )
        .await;
    let job_id = response.body["job_id"].as_str().unwrap().to_string();
    fixture.wait_for_job(&job_id).await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(fixture.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("recast_jobs_submitted_total"));
}
