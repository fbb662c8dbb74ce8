// src/duplicate.rs
//! Decides whether a topic was already covered, based on its title.

use tracing::debug;

use crate::archive::ArchiveIndex;
use crate::keywords::{keywords_as_text, KeywordExtractor};
use crate::model::DuplicateStatus;

pub const ALREADY_COVERED: &str = "already covered";
pub const NOT_YET_COVERED: &str = "not yet covered";

#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    extractor: KeywordExtractor,
    index: ArchiveIndex,
}

impl DuplicateDetector {
    pub fn new(extractor: KeywordExtractor, index: ArchiveIndex) -> Self {
        Self { extractor, index }
    }

    pub fn check(&self, title: &str) -> DuplicateStatus {
        let keywords = self.extractor.extract(title);
        match self.index.find_overlap(&keywords) {
            Some(entry) => {
                debug!(
                    target: "duplicate",
                    title,
                    archive_entry = %keywords_as_text(&entry.keywords),
                    "archive overlap"
                );
                DuplicateStatus {
                    is_duplicate: true,
                    duplicate_info: ALREADY_COVERED.to_string(),
                }
            }
            None => DuplicateStatus {
                is_duplicate: false,
                duplicate_info: NOT_YET_COVERED.to_string(),
            },
        }
    }
}
