//! Rotation service
//!
//! Ties the account client, the workflow engine, the fan-out controller and
//! the history store together behind the operations the API exposes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::account::AccountClient;
use crate::error::{Result, RotaError};
use crate::history::HistoryStore;
use crate::models::{
    FailureReason, ProxyRecord, RotationHistoryEntry, RotationOptions, RotationRequest,
    RotationResult, TargetSelector,
};
use crate::report;
use crate::rotation::{
    resolve_targets, rotate_all, BatchSummary, ResolutionOutcome, ResultSink, RotationEngine,
};

/// Capacity of the progress channel; slow subscribers skip ahead
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Progress notification published while rotations run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RotationEvent {
    BatchStarted {
        total: usize,
        proxy_ids: Vec<String>,
    },
    ResultRecorded {
        result: RotationResult,
        message: String,
        timestamp: DateTime<Utc>,
    },
    BatchFinished {
        summary: BatchSummary,
    },
}

/// Outcome of [`RotationService::execute`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RotationReport {
    /// Several proxies matched; nothing was rotated
    NeedsSelection {
        candidates: Vec<ProxyRecord>,
        message: String,
    },
    NoMatch {
        message: String,
    },
    Completed {
        results: Vec<RotationResult>,
        summary: BatchSummary,
        message: String,
    },
}

/// Result sink that appends to history and publishes progress
pub struct HistoryRecorder {
    history: HistoryStore,
    progress: broadcast::Sender<RotationEvent>,
    engine: Arc<RotationEngine>,
}

impl HistoryRecorder {
    pub fn new(
        history: HistoryStore,
        progress: broadcast::Sender<RotationEvent>,
        engine: Arc<RotationEngine>,
    ) -> Self {
        Self {
            history,
            progress,
            engine,
        }
    }
}

#[async_trait]
impl ResultSink for HistoryRecorder {
    async fn record(&self, result: &RotationResult) {
        let now = self.engine.clock().now();
        let entry = RotationHistoryEntry::from_result(result, now);

        if let Err(e) = self.history.append(entry).await {
            warn!(proxy_id = %result.proxy_id(), "Failed to record rotation history: {}", e);
        }

        // no subscribers is fine
        let _ = self.progress.send(RotationEvent::ResultRecorded {
            result: result.clone(),
            message: report::format_result(result),
            timestamp: now,
        });
    }
}

/// Rotation operations over a user's account
#[derive(Clone)]
pub struct RotationService {
    account: Arc<dyn AccountClient>,
    engine: Arc<RotationEngine>,
    history: HistoryStore,
    progress: broadcast::Sender<RotationEvent>,
    default_credential: Option<String>,
}

impl RotationService {
    pub fn new(
        account: Arc<dyn AccountClient>,
        engine: Arc<RotationEngine>,
        history: HistoryStore,
        default_credential: Option<String>,
    ) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            account,
            engine,
            history,
            progress,
            default_credential,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.progress.subscribe()
    }

    /// Verification options with the configured budget
    pub fn default_options(&self) -> RotationOptions {
        RotationOptions {
            wait_for_completion: true,
            max_wait: self.engine.config().max_wait(),
        }
    }

    /// Pick the caller's credential, or the configured one
    pub fn credential(&self, supplied: Option<&str>) -> Result<String> {
        supplied
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self.default_credential.as_deref())
            .map(str::to_string)
            .ok_or(RotaError::MissingCredential)
    }

    /// Fetch a fresh proxy list and resolve the selector against it
    #[instrument(skip(self, credential))]
    pub async fn resolve_targets(
        &self,
        credential: &str,
        selector: &TargetSelector,
        auto_select_if_unique: bool,
    ) -> Result<ResolutionOutcome> {
        let proxies = self.account.fetch_proxies(credential).await?;
        debug!(count = proxies.len(), "Resolving against account listing");
        resolve_targets(
            &proxies,
            selector,
            auto_select_if_unique,
            self.engine.clock().now(),
        )
    }

    /// Rotate the given targets, recording every result.
    ///
    /// The work runs on its own task: if the caller stops waiting, triggers
    /// that already fired are still verified and recorded.
    #[instrument(skip(self, credential, targets), fields(targets = targets.len()))]
    pub async fn rotate(
        &self,
        credential: &str,
        targets: Vec<ProxyRecord>,
        options: RotationOptions,
    ) -> Vec<RotationResult> {
        let service = self.clone();
        let credential = credential.to_string();
        let submitted = targets.clone();

        let task = tokio::spawn(
            async move { service.rotate_detached(&credential, targets, options).await }
                .in_current_span(),
        );

        match task.await {
            Ok(results) => results,
            Err(e) => {
                error!("Rotation task aborted: {}", e);
                submitted
                    .iter()
                    .map(|proxy| {
                        RotationResult::failed(
                            proxy,
                            FailureReason::TriggerFailed(format!("rotation task aborted: {}", e)),
                            Duration::ZERO,
                        )
                    })
                    .collect()
            }
        }
    }

    async fn rotate_detached(
        &self,
        credential: &str,
        targets: Vec<ProxyRecord>,
        options: RotationOptions,
    ) -> Vec<RotationResult> {
        let recorder = Arc::new(HistoryRecorder::new(
            self.history.clone(),
            self.progress.clone(),
            self.engine.clone(),
        ));

        let results = if targets.len() == 1 {
            let result = self.engine.run(&targets[0], credential, options).await;
            recorder.record(&result).await;
            vec![result]
        } else {
            let _ = self.progress.send(RotationEvent::BatchStarted {
                total: targets.len(),
                proxy_ids: targets.iter().map(|p| p.id.clone()).collect(),
            });
            rotate_all(
                &self.engine,
                targets,
                credential,
                options,
                self.engine.config().max_concurrency,
                recorder,
            )
            .await
        };

        let summary = BatchSummary::from_results(&results);
        let _ = self.progress.send(RotationEvent::BatchFinished { summary });
        results
    }

    /// Resolve and rotate in one call
    #[instrument(skip(self, credential, request))]
    pub async fn execute(&self, credential: &str, request: &RotationRequest) -> Result<RotationReport> {
        let outcome = self
            .resolve_targets(credential, &request.selector, request.auto_select_if_unique)
            .await?;
        let identifier = request.selector.identifier.as_deref();

        match outcome {
            ResolutionOutcome::Empty => {
                info!(identifier = identifier.unwrap_or("-"), "No proxy matched");
                Ok(RotationReport::NoMatch {
                    message: report::format_no_match(identifier),
                })
            }
            ResolutionOutcome::Ambiguous(candidates) => {
                info!(candidates = candidates.len(), "Selection needed before rotating");
                Ok(RotationReport::NeedsSelection {
                    message: report::format_disambiguation(identifier, &candidates),
                    candidates,
                })
            }
            settled => {
                let results = self
                    .rotate(credential, settled.targets(), request.options)
                    .await;
                Ok(RotationReport::Completed {
                    summary: BatchSummary::from_results(&results),
                    message: report::format_batch_summary(&results),
                    results,
                })
            }
        }
    }

    pub async fn get_history(&self, proxy_id: Option<&str>) -> Result<Vec<RotationHistoryEntry>> {
        self.history.list(proxy_id).await
    }

    pub async fn last_rotation(&self, proxy_id: &str) -> Result<Option<RotationHistoryEntry>> {
        self.history.last_for(proxy_id).await
    }
}
