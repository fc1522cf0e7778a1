//! Target resolution endpoint

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::middleware::BearerCredential;
use crate::api::server::AppState;
use crate::error::RotaError;
use crate::models::TargetSelector;
use crate::report;
use crate::rotation::ResolutionOutcome;

#[derive(Debug, Deserialize, Default)]
pub struct ResolveTargetsQuery {
    pub identifier: Option<String>,
    pub filter: Option<String>,
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub auto_select: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveTargetsResponse {
    pub resolution: ResolutionOutcome,
    /// Human-readable text for ambiguous or empty outcomes
    pub message: Option<String>,
}

/// Resolve an identifier/filter against a fresh account listing
pub async fn resolve_targets(
    State(state): State<AppState>,
    credential: BearerCredential,
    Query(query): Query<ResolveTargetsQuery>,
) -> Result<impl IntoResponse, RotaError> {
    let credential = state.service.credential(credential.as_deref())?;
    let selector = TargetSelector {
        identifier: query.identifier,
        filter: query.filter,
        all: query.all,
    };

    let resolution = state
        .service
        .resolve_targets(&credential, &selector, query.auto_select)
        .await?;

    let identifier = selector.identifier.as_deref();
    let message = match &resolution {
        ResolutionOutcome::Ambiguous(candidates) => {
            Some(report::format_disambiguation(identifier, candidates))
        }
        ResolutionOutcome::Empty => Some(report::format_no_match(identifier)),
        _ => None,
    };

    Ok(Json(ResolveTargetsResponse {
        resolution,
        message,
    }))
}
