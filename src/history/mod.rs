//! Bounded rotation history log
//!
//! [`HistoryStore`] is the handle the rest of the crate holds. It owns the
//! backend and the mutex that serializes appends; backends only implement
//! load and append-with-prune.

mod file;
mod memory;

pub use file::FileHistoryBackend;
pub use memory::MemoryHistoryBackend;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::models::RotationHistoryEntry;

/// Maximum number of entries kept; older ones are evicted first
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Persistence for the history log
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Every stored entry, oldest first
    async fn load(&self) -> Result<Vec<RotationHistoryEntry>>;

    /// Add `entry` at the tail and drop entries from the head until at most
    /// `keep` remain. Callers serialize invocations.
    async fn append(&self, entry: &RotationHistoryEntry, keep: usize) -> Result<()>;

    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Keep only the newest `keep` entries of an oldest-first log
pub(crate) fn prune(entries: &mut Vec<RotationHistoryEntry>, keep: usize) {
    if entries.len() > keep {
        let excess = entries.len() - keep;
        entries.drain(..excess);
    }
}

/// Shared handle to the history log
#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    write_lock: Arc<Mutex<()>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self::with_capacity(backend, MAX_HISTORY_ENTRIES)
    }

    pub fn with_capacity(backend: Arc<dyn HistoryBackend>, capacity: usize) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
            capacity: capacity.max(1),
        }
    }

    /// In-memory store, mostly for tests and `HISTORY_BACKEND=memory`
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHistoryBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn append(&self, entry: RotationHistoryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.backend.append(&entry, self.capacity).await?;
        debug!(
            proxy_id = %entry.proxy_id,
            status = entry.status.as_str(),
            backend = self.backend.name(),
            "History entry appended"
        );
        Ok(())
    }

    /// Entries oldest first, optionally only those for `proxy_id`
    pub async fn list(&self, proxy_id: Option<&str>) -> Result<Vec<RotationHistoryEntry>> {
        let entries = self.backend.load().await?;
        Ok(match proxy_id {
            Some(id) => entries.into_iter().filter(|e| e.proxy_id == id).collect(),
            None => entries,
        })
    }

    /// Most recent entry for `proxy_id`
    pub async fn last_for(&self, proxy_id: &str) -> Result<Option<RotationHistoryEntry>> {
        Ok(self.list(Some(proxy_id)).await?.pop())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::RotationStatus;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    /// Entry with a timestamp derived from `seq` so ordering is visible
    pub(crate) fn entry(proxy_id: &str, seq: i64) -> RotationHistoryEntry {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        RotationHistoryEntry {
            id: Uuid::new_v4(),
            proxy_id: proxy_id.to_string(),
            proxy_name: format!("{}_DE", proxy_id),
            old_ip: Some("1.1.1.1".to_string()),
            new_ip: Some(format!("2.2.{}.{}", seq / 256, seq % 256)),
            success: true,
            status: RotationStatus::Confirmed,
            error_code: None,
            error_detail: None,
            elapsed_ms: seq,
            timestamp: base + Duration::seconds(seq),
        }
    }
}
