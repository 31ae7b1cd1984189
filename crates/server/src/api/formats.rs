//! Format discovery handler.

use axum::{extract::Query, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::Path;

use recast_core::output_formats_for_extension;

use super::ErrorResponse;

/// Query parameters for format discovery.
#[derive(Debug, Deserialize)]
pub struct FormatsParams {
    /// Full path whose extension decides the category.
    pub file_path: Option<String>,
    /// Bare extension, with or without a leading dot.
    pub file_ext: Option<String>,
}

/// Response listing valid output formats.
#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<String>,
}

/// `GET /formats?file_path=…|file_ext=…`
///
/// The returned allow-list is fixed per category and independent of
/// converter or tool availability.
pub async fn get_formats(
    Query(params): Query<FormatsParams>,
) -> Result<Json<FormatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let extension = match (&params.file_ext, &params.file_path) {
        (Some(ext), _) => ext.clone(),
        (None, Some(path)) => Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default(),
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Provide file_path or file_ext")),
            ));
        }
    };

    let formats = output_formats_for_extension(&extension)
        .iter()
        .map(|f| f.to_string())
        .collect();
    Ok(Json(FormatsResponse { formats }))
}
