//! Records that flow through the research pipeline.
//!
//! `Candidate` is what a feed hands us, `AnalyzedTopic` is what a scorer makes
//! of it, and `RankedResult` is the artifact written at the end of a run.
//! JSON field names are camelCase so the output stays readable by the
//! editorial front end.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Placeholder written into `duplicate_info` until the duplicate check ran.
pub const DUPLICATE_INFO_UNCHECKED: &str = "not yet checked";

pub const VISUAL_RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
pub const RELEVANCE_SCORE_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// Trust tier of the originating source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityTier {
    /// High trust (public broadcasters, science news).
    Green,
    /// Medium trust (tabloids, aggregators).
    Yellow,
}

impl std::fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredibilityTier::Green => f.write_str("green"),
            CredibilityTier::Yellow => f.write_str("yellow"),
        }
    }
}

/// A raw feed item before analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub source_url: String,
    pub credibility: CredibilityTier,
    pub published_at: Option<DateTime<Utc>>,
}

impl Candidate {
    /// Returns `None` when the (trimmed) title is empty.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        source_name: impl Into<String>,
        source_url: impl Into<String>,
        credibility: CredibilityTier,
        published_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title,
            summary: summary.into(),
            source_name: source_name.into(),
            source_url: source_url.into(),
            credibility,
            published_at,
        })
    }

    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            name: self.source_name.clone(),
            url: self.source_url.clone(),
            credibility: self.credibility,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
    pub credibility: CredibilityTier,
}

/// Suggested shape of the segment if the topic gets produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeProposal {
    pub duration_estimate: String,
    pub segments: Vec<String>,
    pub locations: BTreeSet<String>,
    pub roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dramatic_arc: Option<String>,
}

/// Outcome of a duplicate check, written once onto an [`AnalyzedTopic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateStatus {
    pub is_duplicate: bool,
    pub duplicate_info: String,
}

/// A candidate after scoring, tagging and duplicate annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTopic {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub tags: BTreeSet<String>,
    pub visual_rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_reason: Option<String>,
    pub relevance_score: u8,
    pub credibility: CredibilityTier,
    pub sources: Vec<SourceRef>,
    is_duplicate: bool,
    duplicate_info: String,
    pub narrative_proposal: NarrativeProposal,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    duplicate_checked: bool,
}

impl AnalyzedTopic {
    /// Build a topic for `candidate`; the candidate becomes the first source.
    pub fn from_candidate(
        id: u64,
        candidate: &Candidate,
        tags: BTreeSet<String>,
        visual_rating: u8,
        relevance_score: u8,
        narrative_proposal: NarrativeProposal,
    ) -> Self {
        Self {
            id,
            title: candidate.title.clone(),
            summary: candidate.summary.clone(),
            tags,
            visual_rating,
            visual_reason: None,
            relevance_score,
            credibility: candidate.credibility,
            sources: vec![candidate.source_ref()],
            is_duplicate: false,
            duplicate_info: DUPLICATE_INFO_UNCHECKED.to_string(),
            narrative_proposal,
            published_at: candidate.published_at,
            duplicate_checked: false,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.is_duplicate
    }

    pub fn duplicate_info(&self) -> &str {
        &self.duplicate_info
    }

    pub fn duplicate_checked(&self) -> bool {
        self.duplicate_checked
    }

    /// Write the duplicate fields. Allowed exactly once per topic.
    pub fn apply_duplicate_status(
        &mut self,
        status: DuplicateStatus,
    ) -> Result<(), InvariantViolation> {
        if self.duplicate_checked {
            return Err(InvariantViolation::DuplicateAlreadyChecked { id: self.id });
        }
        self.is_duplicate = status.is_duplicate;
        self.duplicate_info = status.duplicate_info;
        self.duplicate_checked = true;
        Ok(())
    }

    /// Check the ranges and non-emptiness guarantees a scorer must uphold.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if !VISUAL_RATING_RANGE.contains(&self.visual_rating) {
            return Err(InvariantViolation::OutOfRange {
                id: self.id,
                field: "visualRating",
                value: self.visual_rating,
            });
        }
        if !RELEVANCE_SCORE_RANGE.contains(&self.relevance_score) {
            return Err(InvariantViolation::OutOfRange {
                id: self.id,
                field: "relevanceScore",
                value: self.relevance_score,
            });
        }
        if self.tags.is_empty() {
            return Err(InvariantViolation::EmptyTags { id: self.id });
        }
        if self.sources.is_empty() {
            return Err(InvariantViolation::NoSources { id: self.id });
        }
        Ok(())
    }
}

/// Caller bugs surfaced by the core. Never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("topic {id} was already duplicate-checked")]
    DuplicateAlreadyChecked { id: u64 },

    #[error("topic {id} was never duplicate-checked")]
    DuplicateNotChecked { id: u64 },

    #[error("topic {id}: {field}={value} is out of range")]
    OutOfRange {
        id: u64,
        field: &'static str,
        value: u8,
    },

    #[error("topic {id} has no tags")]
    EmptyTags { id: u64 },

    #[error("topic {id} has no sources")]
    NoSources { id: u64 },

    #[error("scorer returned topic id {got}, expected {expected}")]
    UnexpectedId { expected: u64, got: u64 },

    #[error("illegal phase transition {from} -> {to}")]
    PhaseOrder {
        from: &'static str,
        to: &'static str,
    },
}

/// Final artifact of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(rename = "lastUpdate", with = "iso8601")]
    pub generated_at: DateTime<Utc>,
    pub topics: Vec<AnalyzedTopic>,
}

mod iso8601 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
