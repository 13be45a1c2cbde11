//! Append-only archive of finished sessions.
//!
//! One `SessionRecord` per line, JSON encoded. The file and its parent
//! directory are created on the first write.

use async_trait::async_trait;
use powerhour_core::error::{PowerHourError, Result};
use powerhour_core::ports::ResultsSink;
use powerhour_core::session::{SessionRecord, SessionSnapshot};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const RESULTS_FILE: &str = "results.jsonl";

#[derive(Debug)]
pub struct JsonlResultsSink {
    path: PathBuf,
    /// Serializes appends from concurrent session stops
    write_lock: Mutex<()>,
}

impl JsonlResultsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<data dir>/powerhour/results.jsonl`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("powerhour").join(RESULTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every archived record, oldest first. A missing file reads as
    /// empty.
    pub async fn records(&self) -> Result<Vec<SessionRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(PowerHourError::from))
            .collect()
    }

    async fn append(&self, record: &SessionRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ResultsSink for JsonlResultsSink {
    async fn record(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let record = SessionRecord::from(snapshot);
        self.append(&record).await.map_err(|e| {
            tracing::error!(
                target: "results",
                "[ResultsLog] Failed to append to {}: {}",
                self.path.display(),
                e
            );
            PowerHourError::upstream("results", e.to_string())
        })?;
        tracing::info!(
            target: "results",
            "[ResultsLog] Archived session {} for channel {}",
            snapshot.session_id,
            snapshot.channel
        );
        Ok(())
    }
}
