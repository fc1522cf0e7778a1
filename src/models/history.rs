use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{RotationResult, RotationStatus};

/// Persisted record of one rotation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RotationHistoryEntry {
    pub id: Uuid,
    pub proxy_id: String,
    pub proxy_name: String,
    pub old_ip: Option<String>,
    pub new_ip: Option<String>,
    pub success: bool,
    pub status: RotationStatus,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
    pub elapsed_ms: i64,
    pub timestamp: DateTime<Utc>,
}

impl RotationHistoryEntry {
    pub fn from_result(result: &RotationResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            proxy_id: result.proxy_id().to_string(),
            proxy_name: result.proxy_name().to_string(),
            old_ip: result.old_ip().map(str::to_string),
            new_ip: result.new_ip().map(str::to_string),
            success: result.success(),
            status: result.status(),
            error_code: result.error().map(|e| e.code().to_string()),
            error_detail: result.error().map(|e| e.to_string()),
            elapsed_ms: i64::try_from(result.elapsed_ms()).unwrap_or(i64::MAX),
            timestamp,
        }
    }
}

/// History query parameters
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HistoryListParams {
    pub proxy_id: Option<String>,
}
