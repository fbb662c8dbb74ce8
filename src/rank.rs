// src/rank.rs
//! Ranking: editorial priority among admitted topics.
//!
//! Key is `(tag count, visual rating)`, both descending. The sort is stable,
//! so topics with equal keys keep their input order from run to run.

use std::cmp::Reverse;

use crate::model::AnalyzedTopic;

/// `(tag count, visual rating)`
pub fn ranking_key(topic: &AnalyzedTopic) -> (usize, u8) {
    (topic.tags.len(), topic.visual_rating)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn rank(&self, mut topics: Vec<AnalyzedTopic>) -> Vec<AnalyzedTopic> {
        // sort_by_key is stable
        topics.sort_by_key(|t| Reverse(ranking_key(t)));
        topics
    }
}
