//! Append-only ledger of processed post CIDs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::ProcessedIdStore;
use crate::error::{MonitorError, Result};

/// Newline-delimited file of processed post CIDs.
///
/// Every append is its own open/write/close so a crash can only lose the
/// line being written. Appends from concurrent tasks in this process are
/// serialized.
pub struct ProcessedIdLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProcessedIdLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProcessedIdStore for ProcessedIdLedger {
    async fn load(&self) -> Result<HashSet<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(MonitorError::io(&self.path, e)),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    async fn append(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MonitorError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MonitorError::io(&self.path, e))?;

        let line = format!("{id}\n");
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MonitorError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| MonitorError::io(&self.path, e))?;

        Ok(())
    }
}
