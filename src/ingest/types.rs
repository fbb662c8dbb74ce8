// src/ingest/types.rs
use anyhow::Result;

use crate::model::Candidate;

/// A configured feed. Errors are per-source and never abort a run.
#[async_trait::async_trait]
pub trait SourceFeed: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>>;
    fn name(&self) -> &str;
}

/// Result of the fetching phase.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Candidates in source-declaration order, then feed order.
    pub candidates: Vec<Candidate>,
    /// Names of sources that failed and contributed nothing.
    pub failed_sources: Vec<String>,
}
