//! Concurrent rotation of several proxies

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tracing::info;

use super::workflow::RotationEngine;
use crate::models::{ProxyRecord, RotationOptions, RotationResult};

/// Receives each result as soon as its workflow finishes
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, result: &RotationResult);
}

/// Sink that drops everything
pub struct NoopSink;

#[async_trait]
impl ResultSink for NoopSink {
    async fn record(&self, _result: &RotationResult) {}
}

/// Aggregate view over a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub confirmed: usize,
    pub unconfirmed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[RotationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            if result.success() {
                summary.confirmed += 1;
            } else if result.is_unconfirmed() {
                summary.unconfirmed += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }
}

/// Rotate every target with at most `concurrency` workflows in flight.
///
/// One proxy failing never affects the others. Results come back in the
/// order of `targets`; the sink sees them in completion order.
pub async fn rotate_all(
    engine: &RotationEngine,
    targets: Vec<ProxyRecord>,
    credential: &str,
    options: RotationOptions,
    concurrency: usize,
    sink: Arc<dyn ResultSink>,
) -> Vec<RotationResult> {
    let total = targets.len();
    let workers = concurrency.max(1);
    info!(total, workers, "Starting batch rotation");

    let mut results = futures::stream::iter(targets.into_iter().enumerate())
        .map(|(index, proxy)| {
            let sink = sink.clone();
            async move {
                let result = engine.run(&proxy, credential, options).await;
                sink.record(&result).await;
                (index, result)
            }
        })
        .buffer_unordered(workers)
        .collect::<Vec<_>>()
        .await;

    results.sort_by_key(|(index, _)| *index);
    let results: Vec<RotationResult> = results.into_iter().map(|(_, r)| r).collect();

    let summary = BatchSummary::from_results(&results);
    info!(
        "Batch rotation complete: {} confirmed, {} unconfirmed, {} failed",
        summary.confirmed, summary.unconfirmed, summary.failed
    );

    results
}
