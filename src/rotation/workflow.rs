//! Single-proxy rotation workflow
//!
//! The provider gives no callback, so a rotation is driven through an
//! explicit state machine:
//!
//! ```text
//! Idle -> TriggerSent -> Settling -> Polling -> Confirmed
//!                                      |
//!                                      +-> FallbackCheck -> Confirmed | Unconfirmed
//! ```
//!
//! [`transition`] is pure; [`RotationEngine`] performs the I/O each state
//! needs and feeds the observed [`WorkflowEvent`] back in.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::backoff::{with_backoff, BackoffPolicy};
use super::clock::Clock;
use super::status::{extract_ip, trigger_rejection};
use super::transport::{HttpTransport, TransportError};
use crate::account::AccountClient;
use crate::config::RotationConfig;
use crate::models::{FailureReason, ProxyRecord, RotationOptions, RotationResult, VerifiedIp};

/// Account re-fetches made once status polling gives up
pub const FALLBACK_CHECKS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    TriggerSent,
    Settling,
    Polling { attempt: u32 },
    FallbackCheck { attempt: u32 },
    Confirmed(VerifiedIp),
    Unconfirmed(FailureReason),
    Failed(FailureReason),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed(_) | Self::Unconfirmed(_) | Self::Failed(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TriggerSent => "trigger_sent",
            Self::Settling => "settling",
            Self::Polling { .. } => "polling",
            Self::FallbackCheck { .. } => "fallback_check",
            Self::Confirmed(_) => "confirmed",
            Self::Unconfirmed(_) => "unconfirmed",
            Self::Failed(_) => "failed",
        }
    }
}

/// What the engine observed while in the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Started,
    TriggerAccepted,
    TriggerRejected(FailureReason),
    Settled,
    StatusObserved(Option<String>),
    BudgetExhausted,
    AccountObserved(Option<String>),
}

/// Per-proxy facts the transition function needs
#[derive(Debug, Clone, Copy)]
pub struct WorkflowPlan<'a> {
    pub old_ip: Option<&'a str>,
    pub can_trigger: bool,
    pub has_status_url: bool,
    pub wait_for_completion: bool,
    pub poll_attempts: u32,
    pub fallback_checks: u32,
}

impl<'a> WorkflowPlan<'a> {
    pub fn for_proxy(proxy: &'a ProxyRecord, options: &RotationOptions, config: &RotationConfig) -> Self {
        Self {
            old_ip: proxy.current_ip(),
            can_trigger: proxy.can_rotate(),
            has_status_url: proxy.status_url().is_some(),
            wait_for_completion: options.wait_for_completion,
            poll_attempts: config.poll_attempts,
            fallback_checks: FALLBACK_CHECKS,
        }
    }
}

/// Advance the state machine by one event.
///
/// Events that make no sense for the current state leave it unchanged.
pub fn transition(state: WorkflowState, event: WorkflowEvent, plan: &WorkflowPlan<'_>) -> WorkflowState {
    use WorkflowEvent as E;
    use WorkflowState as S;

    match (state, event) {
        (S::Idle, E::Started) => {
            if plan.can_trigger {
                S::TriggerSent
            } else {
                S::Failed(FailureReason::MissingRotationUrl)
            }
        }
        (S::TriggerSent, E::TriggerAccepted) => {
            if plan.wait_for_completion {
                S::Settling
            } else {
                S::Unconfirmed(FailureReason::VerificationSkipped)
            }
        }
        (S::TriggerSent, E::TriggerRejected(reason)) => S::Failed(reason),
        (S::Settling, E::Settled) => {
            if plan.has_status_url && plan.poll_attempts > 0 {
                S::Polling { attempt: 1 }
            } else {
                S::FallbackCheck { attempt: 1 }
            }
        }
        (S::Polling { attempt }, E::StatusObserved(candidate)) => {
            match VerifiedIp::accept(candidate.as_deref(), plan.old_ip) {
                Some(ip) => S::Confirmed(ip),
                None if attempt < plan.poll_attempts => S::Polling {
                    attempt: attempt + 1,
                },
                None => S::FallbackCheck { attempt: 1 },
            }
        }
        (S::Polling { .. }, E::BudgetExhausted) => S::FallbackCheck { attempt: 1 },
        (S::FallbackCheck { attempt }, E::AccountObserved(candidate)) => {
            match VerifiedIp::accept(candidate.as_deref(), plan.old_ip) {
                Some(ip) => S::Confirmed(ip),
                None if attempt < plan.fallback_checks => S::FallbackCheck {
                    attempt: attempt + 1,
                },
                None => S::Unconfirmed(FailureReason::VerificationTimeout),
            }
        }
        (state, _) => state,
    }
}

/// Drives one proxy through the workflow against real (or injected) I/O
pub struct RotationEngine {
    transport: Arc<dyn HttpTransport>,
    account: Arc<dyn AccountClient>,
    clock: Arc<dyn Clock>,
    config: RotationConfig,
}

impl RotationEngine {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        account: Arc<dyn AccountClient>,
        clock: Arc<dyn Clock>,
        config: RotationConfig,
    ) -> Self {
        Self {
            transport,
            account,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.config.retry_attempts, self.config.retry_base_delay())
    }

    /// Rotate one proxy. Never fails: every provider or network problem ends
    /// up in the returned result.
    #[instrument(skip(self, proxy, credential, options), fields(proxy_id = %proxy.id, proxy_name = %proxy.name))]
    pub async fn run(
        &self,
        proxy: &ProxyRecord,
        credential: &str,
        options: RotationOptions,
    ) -> RotationResult {
        let started = self.clock.now();
        let plan = WorkflowPlan::for_proxy(proxy, &options, &self.config);
        let mut state = WorkflowState::Idle;

        while !state.is_terminal() {
            let event = self.step(&state, proxy, credential, &options, started).await;
            let next = transition(state.clone(), event, &plan);
            debug!(from = state.name(), to = next.name(), "Workflow transition");
            state = next;
        }

        let elapsed = self.clock.elapsed_since(started);
        match state {
            WorkflowState::Confirmed(ip) => {
                info!(
                    old_ip = plan.old_ip.unwrap_or("-"),
                    new_ip = ip.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Rotation confirmed"
                );
                RotationResult::confirmed(proxy, ip, elapsed)
            }
            WorkflowState::Unconfirmed(reason) | WorkflowState::Failed(reason) => {
                warn!(reason = reason.code(), "Rotation not confirmed: {}", reason);
                RotationResult::failed(proxy, reason, elapsed)
            }
            other => {
                // unreachable: the loop only exits on terminal states
                RotationResult::failed(
                    proxy,
                    FailureReason::TriggerFailed(format!("workflow stopped in {}", other.name())),
                    elapsed,
                )
            }
        }
    }

    /// Perform the I/O belonging to `state` and report what happened
    async fn step(
        &self,
        state: &WorkflowState,
        proxy: &ProxyRecord,
        credential: &str,
        options: &RotationOptions,
        started: chrono::DateTime<chrono::Utc>,
    ) -> WorkflowEvent {
        match state {
            WorkflowState::Idle => WorkflowEvent::Started,
            WorkflowState::TriggerSent => match proxy.trigger_url() {
                Some(url) => self.send_trigger(url).await,
                None => WorkflowEvent::TriggerRejected(FailureReason::MissingRotationUrl),
            },
            WorkflowState::Settling => {
                self.clock.sleep(self.config.settle_delay()).await;
                WorkflowEvent::Settled
            }
            WorkflowState::Polling { attempt } => {
                if *attempt > 1 {
                    self.clock.sleep(self.config.poll_interval()).await;
                }
                if remaining_budget(self.clock.elapsed_since(started), options.max_wait).is_zero() {
                    debug!(attempt, "Verification budget exhausted during polling");
                    return WorkflowEvent::BudgetExhausted;
                }
                match proxy.status_url() {
                    Some(url) => WorkflowEvent::StatusObserved(
                        self.poll_status(url, *attempt, started, options.max_wait).await,
                    ),
                    None => WorkflowEvent::BudgetExhausted,
                }
            }
            WorkflowState::FallbackCheck { attempt } => {
                if *attempt > 1 {
                    self.clock.sleep(self.config.fallback_delay()).await;
                }
                WorkflowEvent::AccountObserved(self.account_ip(&proxy.id, credential).await)
            }
            WorkflowState::Confirmed(_)
            | WorkflowState::Unconfirmed(_)
            | WorkflowState::Failed(_) => WorkflowEvent::Started,
        }
    }

    async fn send_trigger(&self, url: &str) -> WorkflowEvent {
        let timeout = self.config.trigger_timeout();
        let transport = &self.transport;

        match with_backoff(self.clock.as_ref(), self.backoff(), || transport.get(url, timeout)).await {
            Ok(response) => match trigger_rejection(&response) {
                None => {
                    debug!(status = response.status, "Rotation trigger accepted");
                    WorkflowEvent::TriggerAccepted
                }
                Some(text) => {
                    let reason = FailureReason::ProviderRejected(text);
                    if reason.is_expired_token() {
                        warn!("Rotation link expired, not retrying");
                    } else {
                        warn!(status = response.status, "Rotation trigger rejected");
                    }
                    WorkflowEvent::TriggerRejected(reason)
                }
            },
            Err(e) => {
                warn!("Rotation trigger failed: {}", e);
                WorkflowEvent::TriggerRejected(FailureReason::TriggerFailed(e.to_string()))
            }
        }
    }

    /// One status poll. Each attempt's timeout is clamped to what is left of
    /// `max_wait`, and retries stop once nothing is left.
    async fn poll_status(
        &self,
        url: &str,
        attempt: u32,
        started: chrono::DateTime<chrono::Utc>,
        max_wait: Duration,
    ) -> Option<String> {
        let ceiling = self.config.trigger_timeout();
        let transport = &self.transport;
        let clock = self.clock.as_ref();

        let outcome = with_backoff(clock, self.backoff(), || {
            let timeout = ceiling.min(remaining_budget(clock.elapsed_since(started), max_wait));
            async move {
                if timeout.is_zero() {
                    return Err(TransportError::BudgetExhausted);
                }
                transport.get(url, timeout).await
            }
        })
        .await;

        match outcome {
            Ok(response) if response.is_accepted() => {
                let candidate = response.json().as_ref().and_then(extract_ip);
                debug!(attempt, candidate = candidate.as_deref().unwrap_or("-"), "Status polled");
                candidate
            }
            Ok(response) => {
                debug!(attempt, status = response.status, "Status endpoint returned an error");
                None
            }
            Err(e) => {
                warn!(attempt, "Status poll failed: {}", e);
                None
            }
        }
    }

    async fn account_ip(&self, proxy_id: &str, credential: &str) -> Option<String> {
        match self.account.fetch_proxies(credential).await {
            Ok(proxies) => {
                let ip = proxies
                    .into_iter()
                    .find(|p| p.id == proxy_id)
                    .and_then(|p| p.current_ip().map(str::to_string));
                debug!(ip = ip.as_deref().unwrap_or("-"), "Account listing re-fetched");
                ip
            }
            Err(e) => {
                warn!("Account re-fetch failed during verification: {}", e);
                None
            }
        }
    }
}

/// Time budget left for verification
fn remaining_budget(elapsed: Duration, max_wait: Duration) -> Duration {
    max_wait.saturating_sub(elapsed)
}
