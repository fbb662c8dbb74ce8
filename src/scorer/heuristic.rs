// src/scorer/heuristic.rs
//! Deterministic offline scorer.
//!
//! Derives every rating from a SHA-256 digest of title and summary, so a given
//! candidate always gets the same analysis. Useful without API access and in
//! tests; it knows nothing about the content.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use super::{Scorer, TagVocabulary};
use crate::model::{AnalyzedTopic, Candidate, NarrativeProposal};

/// Candidates whose derived relevance falls below this are "not relevant".
pub const HEURISTIC_REJECT_BELOW: u8 = 4;

const SUMMARY_CHARS: usize = 200;

const DURATIONS: [&str; 3] = ["8-12 Minuten", "10-15 Minuten", "12-18 Minuten"];

const HIGH_VISUAL_REASONS: [&str; 3] = [
    "Spektakuläre visuelle Elemente, gut filmbare Experimente, beeindruckende Locations",
    "Physisch beobachtbare Prozesse, action-reich, visuell faszinierend",
    "Hervorragende Drehmöglichkeiten, spektakuläre Settings, visuell einprägsam",
];

const LOW_VISUAL_REASONS: [&str; 3] = [
    "Begrenzte visuelle Möglichkeiten, hauptsächlich Interviews",
    "Abstrakte Thematik, schwer zu visualisieren",
    "Visuell eher schwach, benötigt kreative Umsetzung",
];

#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    vocabulary: TagVocabulary,
}

impl HeuristicScorer {
    pub fn new(vocabulary: TagVocabulary) -> Self {
        Self { vocabulary }
    }

    fn digest(candidate: &Candidate) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(candidate.title.as_bytes());
        hasher.update(b"\n");
        hasher.update(candidate.summary.as_bytes());
        let mut d = [0u8; 32];
        d.copy_from_slice(&hasher.finalize());
        d
    }

    fn pick_tags(&self, d: &[u8; 32]) -> BTreeSet<String> {
        let vocab = self.vocabulary.as_slice();
        let want = (2 + usize::from(d[1] % 4)).min(vocab.len());
        let mut picked = BTreeSet::new();
        for &b in &d[2..] {
            if picked.len() == want {
                break;
            }
            picked.insert(vocab[usize::from(b) % vocab.len()].clone());
        }
        // Digest collisions on a small vocabulary: top up in declaration order.
        for t in vocab {
            if picked.len() == want {
                break;
            }
            picked.insert(t.clone());
        }
        picked
    }
}

fn narrative(d: &[u8; 32]) -> NarrativeProposal {
    NarrativeProposal {
        duration_estimate: DURATIONS[usize::from(d[9]) % DURATIONS.len()].to_string(),
        segments: vec![
            "Intro: Thema vorstellen (2 Min)".to_string(),
            "Hauptteil: Vor-Ort-Reportage (6-10 Min)".to_string(),
            "Experteneinschätzung (2-3 Min)".to_string(),
            "Finale: Fazit und Ausblick (2 Min)".to_string(),
        ],
        locations: ["Hauptdrehort", "Experteninterview-Location"]
            .into_iter()
            .map(String::from)
            .collect(),
        roles: ["Protagonist/Betroffener", "Experte zum Thema", "Reporter"]
            .into_iter()
            .map(String::from)
            .collect(),
        dramatic_arc: Some(
            "Von der Neugier zur Erkenntnis - eine spannende Entdeckungsreise".to_string(),
        ),
    }
}

#[async_trait::async_trait]
impl Scorer for HeuristicScorer {
    async fn score(&self, id: u64, candidate: &Candidate) -> Result<Option<AnalyzedTopic>> {
        if self.vocabulary.is_empty() {
            bail!("heuristic scorer needs a non-empty tag vocabulary");
        }
        let d = Self::digest(candidate);

        let relevance = 1 + d[0] % 10;
        if relevance < HEURISTIC_REJECT_BELOW {
            return Ok(None);
        }
        let visual = 3 + d[8] % 3;

        let mut topic = AnalyzedTopic::from_candidate(
            id,
            candidate,
            self.pick_tags(&d),
            visual,
            relevance,
            narrative(&d),
        );
        topic.summary = candidate.summary.chars().take(SUMMARY_CHARS).collect();
        let reasons = if visual >= 4 {
            &HIGH_VISUAL_REASONS
        } else {
            &LOW_VISUAL_REASONS
        };
        topic.visual_reason = Some(reasons[usize::from(d[10]) % reasons.len()].to_string());
        Ok(Some(topic))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
