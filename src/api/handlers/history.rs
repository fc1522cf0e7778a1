//! Rotation history endpoints

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::RotaError;
use crate::models::HistoryListParams;
use crate::report;

/// Stored history, oldest first, optionally for one proxy
pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryListParams>,
) -> Result<impl IntoResponse, RotaError> {
    let proxy_id = params
        .proxy_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let entries = state.service.get_history(proxy_id).await?;

    Ok(Json(json!({
        "total": entries.len(),
        "text": report::format_history(&entries),
        "entries": entries,
    })))
}

/// Most recent rotation of one proxy
pub async fn last_rotation(
    State(state): State<AppState>,
    Path(proxy_id): Path<String>,
) -> Result<impl IntoResponse, RotaError> {
    match state.service.last_rotation(&proxy_id).await? {
        Some(entry) => Ok(Json(entry)),
        None => Err(RotaError::NotFound(format!(
            "No rotation recorded for proxy {}",
            proxy_id
        ))),
    }
}
