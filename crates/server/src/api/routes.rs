use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{folder, formats, handlers, history, jobs, metrics};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health))
        .route("/metrics", get(metrics::metrics))
        // Format discovery
        .route("/formats", get(formats::get_formats))
        // Conversion jobs
        .route("/convert", post(jobs::convert))
        .route("/jobs/{job_id}", get(jobs::get_job))
        // History
        .route("/history/recent", get(history::recent))
        .route("/history/search", get(history::search))
        .route("/history/stats", get(history::stats))
        .route("/history", delete(history::purge))
        .route("/history/export", post(history::export))
        // Desktop integration
        .route("/open_folder", post(folder::open_folder))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
