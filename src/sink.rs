// src/sink.rs
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::model::RankedResult;

pub const DEFAULT_OUTPUT_PATH: &str = "docs/data/topics.json";

#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    /// Store the ranked result. Must never leave a half-written artifact behind.
    async fn persist(&self, result: &RankedResult) -> Result<()>;
}

/// Pretty-printed JSON file, replaced atomically.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(&self, result: &RankedResult) -> Result<()> {
        let json = serde_json::to_vec_pretty(result).context("serializing ranked result")?;
        write_atomic(&self.path, &json)?;
        tracing::info!(target: "sink", path = %self.path.display(), topics = result.topics.len(), "result written");
        Ok(())
    }
}

/// Write `bytes` to a sibling temp file, fsync it, then rename over `path`.
/// On failure the temp file is removed and `path` keeps its old content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = tmp_path(path);
    let res = (|| -> Result<()> {
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating temp file {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("writing {}", tmp.display()))?;
        f.sync_all()
            .with_context(|| format!("syncing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    })();
    if res.is_err() && tmp.is_file() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Keeps every persisted result in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    calls: Arc<Mutex<Vec<RankedResult>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results persisted so far, oldest first.
    pub fn calls(&self) -> Vec<RankedResult> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ResultSink for MemorySink {
    async fn persist(&self, result: &RankedResult) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(result.clone());
        Ok(())
    }
}
