//! Common test utilities for in-process API testing with mocks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use recast_core::testing::{mock_registry, MockConverter};
use recast_core::{Config, HistoryStore, JobRunner, SqliteHistoryStore};
use recast_server::api::create_router;
use recast_server::state::AppState;

/// Test fixture: an in-process router over a mock converter registry
/// and an in-memory history store.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter wired into every category slot
    pub converter: Arc<MockConverter>,
    /// In-memory history store, shared with the job runner
    pub history: Arc<SqliteHistoryStore>,
    /// Temporary directory for job outputs and exports
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let converter = Arc::new(MockConverter::new());
        let history = Arc::new(SqliteHistoryStore::in_memory().expect("history store"));

        let registry = Arc::new(mock_registry(Arc::clone(&converter)));
        let jobs = Arc::new(JobRunner::new(
            registry,
            Arc::clone(&history) as Arc<dyn HistoryStore>,
        ));

        let state = Arc::new(AppState::new(
            Config::default(),
            jobs,
            Arc::clone(&history) as Arc<dyn HistoryStore>,
        ));
        let router = create_router(state);

        Self {
            router,
            converter,
            history,
            temp_dir,
        }
    }

    /// Directory for job outputs inside the fixture's temp dir.
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Poll a job until it reports done, failing the test on timeout.
    pub async fn wait_for_job(&self, job_id: &str) -> Value {
        for _ in 0..500 {
            let response = self.get(&format!("/jobs/{}", job_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            let processed = response.body["processed"].as_u64().unwrap();
            let success = response.body["success"].as_u64().unwrap();
            let failed = response.body["failed"].as_u64().unwrap();
            assert_eq!(processed, success + failed);
            if response.body["done"].as_bool().unwrap() {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} did not finish in time", job_id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
