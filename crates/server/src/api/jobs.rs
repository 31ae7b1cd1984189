//! Conversion job handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use recast_core::{Job, JobError, Quality};

use super::ErrorResponse;
use crate::state::AppState;

/// Request body for starting a batch conversion.
#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    /// Input file paths, converted in order.
    pub files: Vec<String>,
    /// Target format tag.
    pub output_format: String,
    /// Directory outputs are written into (created if absent).
    pub output_dir: String,
    /// Quality preset (default: medium).
    #[serde(default)]
    pub quality: Quality,
}

/// Response carrying the issued job id.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub job_id: String,
}

/// `POST /convert`
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConvertBody>,
) -> Result<Json<ConvertResponse>, (StatusCode, Json<ErrorResponse>)> {
    let files: Vec<PathBuf> = body.files.iter().map(PathBuf::from).collect();

    match state.jobs().submit(
        files,
        &body.output_format,
        std::path::Path::new(&body.output_dir),
        body.quality,
    ) {
        Ok(job_id) => Ok(Json(ConvertResponse { job_id })),
        Err(JobError::EmptyFileList) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No files provided")),
        )),
    }
}

/// `GET /jobs/{job_id}` — consistent point-in-time snapshot.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, (StatusCode, Json<ErrorResponse>)> {
    match state.jobs().get(&job_id) {
        Some(job) => Ok(Json(job)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Job not found: {}", job_id))),
        )),
    }
}
