// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod archive;
pub mod config;
pub mod duplicate;
pub mod ingest;
pub mod keywords;
pub mod model;
pub mod pipeline;
pub mod rank;
pub mod relevance;
pub mod scorer;
pub mod sink;

// ---- Re-exports for stable public API ----
pub use crate::archive::ArchiveIndex;
pub use crate::config::ResearchConfig;
pub use crate::duplicate::DuplicateDetector;
pub use crate::keywords::KeywordExtractor;
pub use crate::model::{AnalyzedTopic, Candidate, CredibilityTier, RankedResult};
pub use crate::pipeline::{Phase, PipelineError, PipelineReport, ResearchPipeline};
pub use crate::rank::RankingEngine;
pub use crate::relevance::RelevanceGate;
