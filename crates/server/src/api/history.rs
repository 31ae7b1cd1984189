//! History handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use recast_core::{export_to_path, ConversionRecord, ExportFormat, HistoryStats};

use super::ErrorResponse;
use crate::state::AppState;

/// Maximum allowed limit for history queries
const MAX_LIMIT: u32 = 1000;

/// Default limit for history queries
const DEFAULT_LIMIT: u32 = 100;

/// Default trailing window for statistics, in days
const DEFAULT_STATS_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    pub older_than_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportBody {
    /// Destination file path.
    pub path: String,
    /// "json" or "csv" (default: json).
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<ConversionRecord>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub ok: bool,
    pub exported: usize,
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(e.to_string())),
    )
}

/// `GET /history/recent?limit=1..1000` (default 100)
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<ItemsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state.history().recent(limit).map_err(internal_error)?;
    Ok(Json(ItemsResponse { items }))
}

/// `GET /history/search?q=…&limit=…` — case-insensitive substring match.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ItemsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Provide a search query via q")),
        ));
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state
        .history()
        .search(&query, limit)
        .map_err(internal_error)?;
    Ok(Json(ItemsResponse { items }))
}

/// `GET /history/stats?days=…`
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<Json<HistoryStats>, (StatusCode, Json<ErrorResponse>)> {
    let days = params.days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, 365);
    let stats = state.history().stats(days).map_err(internal_error)?;
    Ok(Json(stats))
}

/// `DELETE /history?older_than_days=…` — delete everything when no
/// cutoff is given.
pub async fn purge(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PurgeParams>,
) -> Result<Json<PurgeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let deleted = state
        .history()
        .purge(params.older_than_days)
        .map_err(internal_error)?;
    Ok(Json(PurgeResponse { deleted }))
}

/// `POST /history/export {path, format}`
pub async fn export(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExportBody>,
) -> Result<Json<ExportResponse>, (StatusCode, Json<ErrorResponse>)> {
    let format: ExportFormat = body
        .format
        .as_deref()
        .unwrap_or("json")
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))))?;

    let limit = state.config().history.max_export_entries;
    let records = state.history().recent(limit).map_err(internal_error)?;
    let exported = export_to_path(&records, format, std::path::Path::new(&body.path))
        .map_err(internal_error)?;

    Ok(Json(ExportResponse { ok: true, exported }))
}
