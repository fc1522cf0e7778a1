use async_trait::async_trait;
use parking_lot::RwLock;

use super::{prune, HistoryBackend};
use crate::error::Result;
use crate::models::RotationHistoryEntry;

/// Non-persistent history, lost on restart
#[derive(Default)]
pub struct MemoryHistoryBackend {
    entries: RwLock<Vec<RotationHistoryEntry>>,
}

impl MemoryHistoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistoryBackend {
    async fn load(&self) -> Result<Vec<RotationHistoryEntry>> {
        Ok(self.entries.read().clone())
    }

    async fn append(&self, entry: &RotationHistoryEntry, keep: usize) -> Result<()> {
        let mut entries = self.entries.write();
        entries.push(entry.clone());
        prune(&mut entries, keep);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
