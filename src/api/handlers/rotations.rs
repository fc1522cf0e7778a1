//! Rotation endpoint

use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::api::middleware::BearerCredential;
use crate::api::server::AppState;
use crate::error::RotaError;
use crate::models::{RotationOptions, RotationRequest, TargetSelector};

/// Longest verification budget a caller may ask for
pub const MAX_WAIT_CEILING: Duration = Duration::from_secs(600);

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateRotationRequest {
    pub identifier: Option<String>,
    pub filter: Option<String>,
    #[serde(default)]
    pub all: bool,
    #[serde(default = "default_true")]
    pub wait_for_completion: bool,
    pub max_wait_ms: Option<u64>,
    #[serde(default)]
    pub auto_select_if_unique: bool,
}

impl CreateRotationRequest {
    fn into_request(self, defaults: RotationOptions) -> Result<RotationRequest, RotaError> {
        let max_wait = match self.max_wait_ms {
            Some(0) => {
                return Err(RotaError::InvalidRequest(
                    "max_wait_ms must be greater than zero".to_string(),
                ))
            }
            Some(ms) => Duration::from_millis(ms).min(MAX_WAIT_CEILING),
            None => defaults.max_wait,
        };

        Ok(RotationRequest {
            selector: TargetSelector {
                identifier: self.identifier,
                filter: self.filter,
                all: self.all,
            },
            options: RotationOptions {
                wait_for_completion: self.wait_for_completion,
                max_wait,
            },
            auto_select_if_unique: self.auto_select_if_unique,
        })
    }
}

/// Resolve targets and rotate them.
///
/// Ambiguous input returns a selection listing and rotates nothing.
pub async fn create_rotation(
    State(state): State<AppState>,
    credential: BearerCredential,
    Json(body): Json<CreateRotationRequest>,
) -> Result<impl IntoResponse, RotaError> {
    let credential = state.service.credential(credential.as_deref())?;
    let request = body.into_request(state.service.default_options())?;

    info!(
        identifier = request.selector.identifier.as_deref().unwrap_or("-"),
        filter = request.selector.filter.as_deref().unwrap_or("-"),
        all = request.selector.all,
        "Rotation requested"
    );

    let report = state.service.execute(&credential, &request).await?;
    Ok(Json(report))
}
