use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::{prune, HistoryBackend};
use crate::error::Result;
use crate::models::RotationHistoryEntry;

/// History kept as a JSON array on disk.
///
/// Writes go to a sibling temp file that is then renamed over the log, so a
/// crash mid-write leaves the previous log intact.
pub struct FileHistoryBackend {
    path: PathBuf,
}

impl FileHistoryBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_all(&self, entries: &[RotationHistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(entries)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryBackend for FileHistoryBackend {
    async fn load(&self) -> Result<Vec<RotationHistoryEntry>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "History file is unreadable, starting a new log: {}",
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn append(&self, entry: &RotationHistoryEntry, keep: usize) -> Result<()> {
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.push(entry.clone());
        prune(&mut entries, keep);

        if entries.len() <= before {
            info!(evicted = before + 1 - entries.len(), "Evicted oldest history entries");
        }

        self.write_all(&entries).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
