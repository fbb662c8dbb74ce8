// src/scorer/mod.rs
//! Scorers turn a candidate into an analyzed topic, or reject it as not relevant.
//!
//! How relevance is computed is up to the implementation; the pipeline only
//! relies on the `(candidate) -> Option<AnalyzedTopic>` contract and treats a
//! returned error as fatal for the run.

pub mod heuristic;
pub mod openai;

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ScorerConfig;
use crate::model::{AnalyzedTopic, Candidate};

pub use heuristic::HeuristicScorer;
pub use openai::OpenAiScorer;

#[async_trait::async_trait]
pub trait Scorer: Send + Sync {
    /// `id` is assigned by the caller and must be used for the returned topic.
    async fn score(&self, id: u64, candidate: &Candidate) -> Result<Option<AnalyzedTopic>>;
    fn name(&self) -> &'static str;
}

pub type DynScorer = Arc<dyn Scorer>;

pub const ENV_SCORER: &str = "RESEARCH_SCORER";

pub const DEFAULT_TAGS: &[&str] = &[
    "Bildstark",
    "Gesellschaftlich Relevant",
    "Gerade aktuell",
    "Wissenschaft",
    "Entertainment",
    "Technologie",
    "Natur & Umwelt",
    "Gesundheit",
    "Psychologie",
    "Mysterium",
    "Experiment",
    "Innovation",
    "Trend",
    "Ungewöhnlich",
    "Spektakulär",
];

/// Controlled vocabulary a scorer may tag with. Order is declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVocabulary {
    tags: Vec<String>,
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_TAGS.iter().copied())
    }
}

impl TagVocabulary {
    /// Trims entries and drops blanks and repeats.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        Self { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    /// Canonical spelling of `tag` if it is in the vocabulary (case-insensitive).
    pub fn canonical(&self, tag: &str) -> Option<&str> {
        let t = tag.trim();
        self.tags
            .iter()
            .find(|v| v.to_lowercase() == t.to_lowercase())
            .map(String::as_str)
    }

    /// Keep only known tags, mapped to their canonical spelling.
    pub fn restrict<I, S>(&self, tags: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .filter_map(|t| self.canonical(t.as_ref()).map(str::to_string))
            .collect()
    }
}

/// Pick the scorer for this process.
///
/// * `RESEARCH_SCORER=heuristic` forces the deterministic heuristic scorer.
/// * provider `openai` uses the LLM scorer when `OPENAI_API_KEY` is set and
///   falls back to the heuristic one otherwise.
pub fn build_scorer(cfg: &ScorerConfig) -> Result<DynScorer> {
    let vocabulary = TagVocabulary::new(&cfg.tags);
    let forced = std::env::var(ENV_SCORER).ok();
    let provider = forced
        .as_deref()
        .unwrap_or(cfg.provider.as_str())
        .trim()
        .to_ascii_lowercase();

    match provider.as_str() {
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                info!(target: "scorer", model = %cfg.model, "using openai scorer");
                Ok(Arc::new(OpenAiScorer::new(key, &cfg.model, vocabulary)?))
            }
            _ => {
                warn!(target: "scorer", "OPENAI_API_KEY missing; falling back to heuristic scorer");
                Ok(Arc::new(HeuristicScorer::new(vocabulary)))
            }
        },
        "heuristic" => Ok(Arc::new(HeuristicScorer::new(vocabulary))),
        other => anyhow::bail!("unsupported scorer provider: {other}"),
    }
}
