// src/pipeline.rs
//! Research run orchestration.
//!
//! Phases run strictly in order on an in-memory batch:
//! `Idle → Fetching → Analyzing → Deduplicating → Ranking → Persisted → Idle`.
//! An unreachable source is tolerated (zero candidates). Anything failing
//! after fetching aborts the run before the sink is touched.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use tracing::info;

use crate::archive::ArchiveIndex;
use crate::config::ResearchConfig;
use crate::duplicate::DuplicateDetector;
use crate::ingest::fetch_all;
use crate::ingest::rss::{RssFeed, RssFeedOptions};
use crate::ingest::types::SourceFeed;
use crate::keywords::KeywordExtractor;
use crate::model::{AnalyzedTopic, Candidate, InvariantViolation, RankedResult};
use crate::rank::RankingEngine;
use crate::relevance::RelevanceGate;
use crate::scorer::{build_scorer, DynScorer};
use crate::sink::{JsonFileSink, ResultSink};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("research_relevant_total", "Topics admitted by the relevance gate.");
        describe_counter!("research_duplicates_total", "Topics flagged as already covered.");
        describe_counter!("research_persisted_total", "Topics written by the result sink.");
        describe_counter!("research_runs_failed_total", "Runs aborted with a fatal error.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    Fetching,
    Analyzing,
    Deduplicating,
    Ranking,
    Persisted,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Analyzing => "analyzing",
            Phase::Deduplicating => "deduplicating",
            Phase::Ranking => "ranking",
            Phase::Persisted => "persisted",
        }
    }

    /// The only phase allowed to follow `self`.
    pub fn next(&self) -> Phase {
        match self {
            Phase::Idle => Phase::Fetching,
            Phase::Fetching => Phase::Analyzing,
            Phase::Analyzing => Phase::Deduplicating,
            Phase::Deduplicating => Phase::Ranking,
            Phase::Ranking => Phase::Persisted,
            Phase::Persisted => Phase::Idle,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal run errors. Source failures never show up here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("scoring failed for `{title}`: {source:#}")]
    Scoring {
        title: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invariant violated while {phase}: {violation}")]
    Invariant {
        phase: Phase,
        #[source]
        violation: InvariantViolation,
    },

    #[error("persisting results failed: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl PipelineError {
    /// Phase the run was in when it failed.
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::Scoring { .. } => Phase::Analyzing,
            PipelineError::Invariant { phase, .. } => *phase,
            PipelineError::Persistence(_) => Phase::Persisted,
        }
    }

    /// Process exit status; distinct per failing phase. 2 is reserved for
    /// configuration errors in the binary.
    pub fn exit_code(&self) -> u8 {
        match self.phase() {
            Phase::Idle | Phase::Fetching => 1,
            Phase::Analyzing => 3,
            Phase::Deduplicating => 4,
            Phase::Ranking => 5,
            Phase::Persisted => 6,
        }
    }
}

/// Counts per phase of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub fetched: usize,
    pub failed_sources: Vec<String>,
    pub relevant: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub persisted: usize,
}

pub struct ResearchPipeline {
    feeds: Vec<Box<dyn SourceFeed>>,
    scorer: DynScorer,
    gate: RelevanceGate,
    detector: DuplicateDetector,
    ranker: RankingEngine,
    sink: Box<dyn ResultSink>,
    phase: Phase,
}

impl ResearchPipeline {
    pub fn new(
        feeds: Vec<Box<dyn SourceFeed>>,
        scorer: DynScorer,
        gate: RelevanceGate,
        detector: DuplicateDetector,
        ranker: RankingEngine,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            feeds,
            scorer,
            gate,
            detector,
            ranker,
            sink,
            phase: Phase::Idle,
        }
    }

    /// Wire RSS feeds, the configured scorer, the archive and a JSON file sink.
    pub fn from_config(cfg: &ResearchConfig) -> anyhow::Result<Self> {
        let opts = RssFeedOptions {
            max_items: cfg.pipeline.max_items_per_source,
            days_back: cfg.pipeline.days_back,
        };
        let feeds = cfg
            .sources
            .iter()
            .map(|s| {
                RssFeed::from_url(&s.name, s.credibility, &s.url, opts.clone())
                    .map(|f| Box::new(f) as Box<dyn SourceFeed>)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let extractor = KeywordExtractor::new(&cfg.keywords.stop_words);
        let titles = cfg.archive_titles()?;
        let index = ArchiveIndex::from_titles(&titles, &extractor)
            .with_min_shared(cfg.pipeline.min_shared_keywords);
        info!(target: "pipeline", sources = feeds.len(), archive_entries = index.len(), "pipeline configured");

        Ok(Self::new(
            feeds,
            build_scorer(&cfg.scorer)?,
            RelevanceGate::new(cfg.pipeline.min_relevance),
            DuplicateDetector::new(extractor, index),
            RankingEngine,
            Box::new(JsonFileSink::new(&cfg.pipeline.output_path)),
        ))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, to: Phase) -> Result<(), PipelineError> {
        if self.phase.next() != to {
            return Err(PipelineError::Invariant {
                phase: self.phase,
                violation: InvariantViolation::PhaseOrder {
                    from: self.phase.as_str(),
                    to: to.as_str(),
                },
            });
        }
        tracing::debug!(target: "pipeline", from = %self.phase, to = %to, "phase");
        self.phase = to;
        Ok(())
    }

    /// Run all phases once. `now` stamps the result.
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<PipelineReport, PipelineError> {
        ensure_metrics_described();
        let res = self.run_phases(now).await;
        // Back to Idle whether or not the run made it through.
        self.phase = Phase::Idle;
        if let Err(e) = &res {
            counter!("research_runs_failed_total").increment(1);
            tracing::error!(target: "pipeline", phase = %e.phase(), error = %e, "run aborted");
        }
        res
    }

    async fn run_phases(&mut self, now: DateTime<Utc>) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();

        // Fetching
        self.advance(Phase::Fetching)?;
        let fetched = fetch_all(&self.feeds).await;
        report.fetched = fetched.candidates.len();
        report.failed_sources = fetched.failed_sources;
        info!(target: "pipeline", fetched = report.fetched, failed_sources = report.failed_sources.len(), "fetching done");

        // Analyzing
        self.advance(Phase::Analyzing)?;
        let analyzed = self.analyze(&fetched.candidates).await?;
        report.relevant = analyzed.len();
        counter!("research_relevant_total").increment(analyzed.len() as u64);
        info!(target: "pipeline", relevant = report.relevant, scorer = self.scorer.name(), "analysis done");

        // Deduplicating
        self.advance(Phase::Deduplicating)?;
        let deduped = self.deduplicate(analyzed)?;
        report.duplicates = deduped.iter().filter(|t| t.is_duplicate()).count();
        report.unique = deduped.len() - report.duplicates;
        counter!("research_duplicates_total").increment(report.duplicates as u64);
        info!(target: "pipeline", unique = report.unique, duplicates = report.duplicates, "duplicate check done");

        // Ranking
        self.advance(Phase::Ranking)?;
        ensure_duplicate_checked(&deduped)?;
        let ranked = self.ranker.rank(deduped);

        // Persisted
        self.advance(Phase::Persisted)?;
        let result = RankedResult {
            generated_at: now,
            topics: ranked,
        };
        self.sink
            .persist(&result)
            .await
            .map_err(PipelineError::Persistence)?;
        report.persisted = result.topics.len();
        counter!("research_persisted_total").increment(report.persisted as u64);
        info!(target: "pipeline", persisted = report.persisted, "run complete");

        self.advance(Phase::Idle)?;
        Ok(report)
    }

    async fn analyze(
        &self,
        candidates: &[Candidate],
    ) -> Result<Vec<AnalyzedTopic>, PipelineError> {
        let mut admitted = Vec::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            let id = idx as u64 + 1;
            let scored = self
                .scorer
                .score(id, candidate)
                .await
                .map_err(|source| PipelineError::Scoring {
                    title: candidate.title.clone(),
                    source,
                })?;
            if let Some(topic) = &scored {
                if topic.id != id {
                    return Err(PipelineError::Invariant {
                        phase: Phase::Analyzing,
                        violation: InvariantViolation::UnexpectedId {
                            expected: id,
                            got: topic.id,
                        },
                    });
                }
                topic.validate().map_err(|violation| PipelineError::Invariant {
                    phase: Phase::Analyzing,
                    violation,
                })?;
            }
            if let Some(topic) = self.gate.admit(scored) {
                admitted.push(topic);
            }
        }
        Ok(admitted)
    }

    fn deduplicate(
        &self,
        mut topics: Vec<AnalyzedTopic>,
    ) -> Result<Vec<AnalyzedTopic>, PipelineError> {
        let mut seen = HashSet::with_capacity(topics.len());
        for topic in topics.iter_mut() {
            // A repeated id would mean one topic gets checked twice.
            if !seen.insert(topic.id) {
                return Err(PipelineError::Invariant {
                    phase: Phase::Deduplicating,
                    violation: InvariantViolation::DuplicateAlreadyChecked { id: topic.id },
                });
            }
            let status = self.detector.check(&topic.title);
            topic
                .apply_duplicate_status(status)
                .map_err(|violation| PipelineError::Invariant {
                    phase: Phase::Deduplicating,
                    violation,
                })?;
        }
        Ok(topics)
    }
}

/// Ranking only accepts topics that went through the duplicate check.
fn ensure_duplicate_checked(topics: &[AnalyzedTopic]) -> Result<(), PipelineError> {
    match topics.iter().find(|t| !t.duplicate_checked()) {
        Some(t) => Err(PipelineError::Invariant {
            phase: Phase::Ranking,
            violation: InvariantViolation::DuplicateNotChecked { id: t.id },
        }),
        None => Ok(()),
    }
}
