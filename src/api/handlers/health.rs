//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::api::server::AppState;

/// Liveness probe
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rota-modem"
        })),
    )
}

/// Uptime, history backend and database reachability
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let history = state.service.history();
    let entries = match history.list(None).await {
        Ok(entries) => Some(entries.len()),
        Err(e) => {
            warn!("History unavailable for status: {}", e);
            None
        }
    };

    let database = match &state.db {
        Some(db) => match db.health_check().await {
            Ok(latency) => json!({
                "status": "ok",
                "latency_ms": latency.as_millis() as u64,
                "pool": db.pool_stats(),
            }),
            Err(e) => json!({ "status": "error", "error": e.to_string() }),
        },
        None => json!({ "status": "unused" }),
    };

    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "history": {
            "backend": history.backend_name(),
            "entries": entries,
        },
        "database": database,
        "rotation": {
            "max_concurrency": state.config.rotation.max_concurrency,
            "max_wait_secs": state.config.rotation.max_wait,
        },
    }))
}
