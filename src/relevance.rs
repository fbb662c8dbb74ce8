// src/relevance.rs
//! Relevance gate: admits scored topics whose relevance meets the minimum.
//!
//! Relevance decides inclusion only; ordering among admitted topics is the
//! ranking stage's job.

use tracing::debug;

use crate::model::{AnalyzedTopic, RELEVANCE_SCORE_RANGE};

/// Minimum relevance (1..=10) for a topic to stay in the run.
pub const DEFAULT_MIN_RELEVANCE: u8 = 7;

pub const ENV_MIN_RELEVANCE: &str = "RESEARCH_MIN_RELEVANCE";

/// Parse an optional threshold override and clamp it into the score range.
pub fn parse_min_relevance_env(raw: Option<String>) -> Option<u8> {
    raw.and_then(|s| s.trim().parse::<u8>().ok())
        .map(|v| v.clamp(*RELEVANCE_SCORE_RANGE.start(), *RELEVANCE_SCORE_RANGE.end()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceGate {
    min_relevance: u8,
}

impl Default for RelevanceGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RELEVANCE)
    }
}

impl RelevanceGate {
    pub fn new(min_relevance: u8) -> Self {
        Self { min_relevance }
    }

    pub fn min_relevance(&self) -> u8 {
        self.min_relevance
    }

    /// Pass `scored` through unchanged iff it is present and meets the minimum.
    pub fn admit(&self, scored: Option<AnalyzedTopic>) -> Option<AnalyzedTopic> {
        let topic = scored?;
        if topic.relevance_score >= self.min_relevance {
            Some(topic)
        } else {
            debug!(
                target: "relevance",
                id = topic.id,
                score = topic.relevance_score,
                threshold = self.min_relevance,
                "below relevance threshold"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candidate, CredibilityTier, NarrativeProposal};

    fn scored(relevance: u8) -> Option<AnalyzedTopic> {
        let c = Candidate::new("Titel", "", "Quelle", "", CredibilityTier::Green, None).unwrap();
        let tags = ["Trend".to_string()].into_iter().collect();
        Some(AnalyzedTopic::from_candidate(
            1,
            &c,
            tags,
            3,
            relevance,
            NarrativeProposal::default(),
        ))
    }

    #[test]
    fn boundary() {
        let gate = RelevanceGate::default();
        assert!(gate.admit(scored(6)).is_none());
        assert!(gate.admit(scored(7)).is_some());
        assert!(gate.admit(scored(10)).is_some());
        assert!(gate.admit(None).is_none());
    }

    #[test]
    fn admitted_topic_is_unchanged() {
        let input = scored(9);
        let out = RelevanceGate::default().admit(input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn custom_threshold() {
        let gate = RelevanceGate::new(4);
        assert!(gate.admit(scored(4)).is_some());
        assert!(gate.admit(scored(3)).is_none());
    }

    #[test]
    fn env_override_parses_and_clamps() {
        assert_eq!(parse_min_relevance_env(Some(" 5 ".into())), Some(5));
        assert_eq!(parse_min_relevance_env(Some("42".into())), Some(10));
        assert_eq!(parse_min_relevance_env(Some("0".into())), Some(1));
        assert_eq!(parse_min_relevance_env(Some("seven".into())), None);
        assert_eq!(parse_min_relevance_env(None), None);
    }
}
