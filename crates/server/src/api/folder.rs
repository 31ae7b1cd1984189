//! Desktop integration: open a folder in the OS file browser.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ErrorResponse;

#[derive(Debug, Deserialize)]
pub struct OpenFolderBody {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct OpenFolderResponse {
    pub ok: bool,
}

#[cfg(target_os = "windows")]
const OPENER: &str = "explorer";
#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const OPENER: &str = "xdg-open";

/// `POST /open_folder {path}`
pub async fn open_folder(
    Json(body): Json<OpenFolderBody>,
) -> Result<Json<OpenFolderResponse>, (StatusCode, Json<ErrorResponse>)> {
    let path = Path::new(&body.path);
    if !path.is_dir() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "Not a directory: {}",
                body.path
            ))),
        ));
    }

    match std::process::Command::new(OPENER).arg(path).spawn() {
        Ok(_) => Ok(Json(OpenFolderResponse { ok: true })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!(
                "Failed to open folder: {}",
                e
            ))),
        )),
    }
}
