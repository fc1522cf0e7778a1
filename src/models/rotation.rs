use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ProxyRecord;

/// Sentinel some providers return while the modem is still reconnecting
pub const UNKNOWN_IP_SENTINEL: &str = "unknown";

/// Terminal classification of a rotation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RotationStatus {
    Confirmed,
    Unconfirmed,
    Failed,
}

impl RotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationStatus::Confirmed => "confirmed",
            RotationStatus::Unconfirmed => "unconfirmed",
            RotationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a rotation did not end in a confirmed IP change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The proxy has no rotation trigger URL
    MissingRotationUrl,
    /// Provider answered with an explicit error (text kept verbatim)
    ProviderRejected(String),
    /// Trigger call kept failing at the network level
    TriggerFailed(String),
    /// Trigger accepted but no IP change was observed in time
    VerificationTimeout,
    /// Trigger accepted and the caller asked not to wait
    VerificationSkipped,
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::MissingRotationUrl => "missing_rotation_url",
            FailureReason::ProviderRejected(_) => "provider_rejected",
            FailureReason::TriggerFailed(_) => "trigger_failed",
            FailureReason::VerificationTimeout => "verification_timeout",
            FailureReason::VerificationSkipped => "verification_skipped",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            FailureReason::ProviderRejected(text) | FailureReason::TriggerFailed(text) => {
                Some(text)
            }
            _ => None,
        }
    }

    /// The provider may still complete the rotation later
    pub fn is_unconfirmed(&self) -> bool {
        matches!(
            self,
            FailureReason::VerificationTimeout | FailureReason::VerificationSkipped
        )
    }

    /// Provider tokens that expired never become valid by retrying
    pub fn is_expired_token(&self) -> bool {
        match self {
            FailureReason::ProviderRejected(text) => text.to_lowercase().contains("expired"),
            _ => false,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::MissingRotationUrl => write!(f, "no rotation URL for this proxy"),
            FailureReason::ProviderRejected(text) => write!(f, "provider rejected: {}", text),
            FailureReason::TriggerFailed(text) => write!(f, "trigger failed: {}", text),
            FailureReason::VerificationTimeout => {
                write!(f, "IP change not confirmed yet, check again later")
            }
            FailureReason::VerificationSkipped => {
                write!(f, "rotation triggered, verification skipped")
            }
        }
    }
}

/// An IP that has been checked against the pre-rotation IP
///
/// Only obtainable through [`VerifiedIp::accept`], so a confirmed result can
/// never carry an empty, sentinel or unchanged address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIp(String);

impl VerifiedIp {
    pub fn accept(candidate: Option<&str>, old_ip: Option<&str>) -> Option<Self> {
        let candidate = candidate?.trim();
        if candidate.is_empty() || candidate.eq_ignore_ascii_case(UNKNOWN_IP_SENTINEL) {
            return None;
        }
        if old_ip.map(str::trim) == Some(candidate) {
            return None;
        }
        Some(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Outcome of one proxy's rotation workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationResult {
    proxy_id: String,
    proxy_name: String,
    old_ip: Option<String>,
    new_ip: Option<String>,
    success: bool,
    status: RotationStatus,
    elapsed_ms: u64,
    error: Option<FailureReason>,
}

impl RotationResult {
    pub fn confirmed(proxy: &ProxyRecord, new_ip: VerifiedIp, elapsed: Duration) -> Self {
        Self {
            proxy_id: proxy.id.clone(),
            proxy_name: proxy.name.clone(),
            old_ip: proxy.current_ip().map(str::to_string),
            new_ip: Some(new_ip.into_inner()),
            success: true,
            status: RotationStatus::Confirmed,
            elapsed_ms: elapsed.as_millis() as u64,
            error: None,
        }
    }

    pub fn failed(proxy: &ProxyRecord, reason: FailureReason, elapsed: Duration) -> Self {
        let status = if reason.is_unconfirmed() {
            RotationStatus::Unconfirmed
        } else {
            RotationStatus::Failed
        };

        Self {
            proxy_id: proxy.id.clone(),
            proxy_name: proxy.name.clone(),
            old_ip: proxy.current_ip().map(str::to_string),
            new_ip: None,
            success: false,
            status,
            elapsed_ms: elapsed.as_millis() as u64,
            error: Some(reason),
        }
    }

    pub fn proxy_id(&self) -> &str {
        &self.proxy_id
    }

    pub fn proxy_name(&self) -> &str {
        &self.proxy_name
    }

    pub fn old_ip(&self) -> Option<&str> {
        self.old_ip.as_deref()
    }

    pub fn new_ip(&self) -> Option<&str> {
        self.new_ip.as_deref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn status(&self) -> RotationStatus {
        self.status
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn error(&self) -> Option<&FailureReason> {
        self.error.as_ref()
    }

    pub fn is_unconfirmed(&self) -> bool {
        self.status == RotationStatus::Unconfirmed
    }
}

/// Which proxies a rotation request is aimed at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSelector {
    /// Free-form identifier: name, id, dongle number, country code or fragment
    pub identifier: Option<String>,
    /// Filter tokens such as `online` or `older-than-6h`
    pub filter: Option<String>,
    /// Rotate every match instead of asking for disambiguation
    pub all: bool,
}

/// Per-invocation verification knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOptions {
    pub wait_for_completion: bool,
    pub max_wait: Duration,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            wait_for_completion: true,
            max_wait: Duration::from_secs(90),
        }
    }
}

/// Caller input for one rotation operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationRequest {
    pub selector: TargetSelector,
    pub options: RotationOptions,
    /// With no identifier and no filter, pick the account's only proxy
    pub auto_select_if_unique: bool,
}
