//! HTTP API surface.

mod folder;
mod formats;
mod handlers;
mod history;
mod jobs;
mod metrics;
mod routes;

use serde::Serialize;

pub use routes::create_router;

/// Error response body shared by all handlers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
