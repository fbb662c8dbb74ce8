// src/archive.rs
//! Keyword signatures of topics that were already covered.
//!
//! The index is built once at startup and never mutated during a run.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::keywords::KeywordExtractor;

/// Shared keywords needed before an archive entry counts as the same topic.
/// A single generic noun in common is not enough.
pub const DEFAULT_MIN_SHARED_KEYWORDS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub keywords: BTreeSet<String>,
}

impl ArchiveEntry {
    pub fn shared_with(&self, keywords: &BTreeSet<String>) -> usize {
        self.keywords.intersection(keywords).count()
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    entries: Vec<ArchiveEntry>,
    min_shared: usize,
}

impl ArchiveIndex {
    /// Extract and cache the keyword set of every title.
    pub fn from_titles<I, S>(titles: I, extractor: &KeywordExtractor) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_keyword_sets(titles.into_iter().map(|t| extractor.extract(t.as_ref())))
    }

    pub fn from_keyword_sets<I>(sets: I) -> Self
    where
        I: IntoIterator<Item = BTreeSet<String>>,
    {
        Self {
            entries: sets
                .into_iter()
                .map(|keywords| ArchiveEntry { keywords })
                .collect(),
            min_shared: DEFAULT_MIN_SHARED_KEYWORDS,
        }
    }

    /// Override the overlap threshold (clamped to at least 1).
    pub fn with_min_shared(mut self, min_shared: usize) -> Self {
        self.min_shared = min_shared.max(1);
        self
    }

    pub fn min_shared(&self) -> usize {
        self.min_shared
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry sharing at least `min_shared` keywords, if any.
    pub fn find_overlap(&self, keywords: &BTreeSet<String>) -> Option<&ArchiveEntry> {
        if keywords.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.shared_with(keywords) >= self.min_shared)
    }

    pub fn overlaps(&self, keywords: &BTreeSet<String>) -> bool {
        self.find_overlap(keywords).is_some()
    }
}

/// Load archive titles from a file. Supports TOML (`titles = [...]`) or a JSON array.
pub fn load_archive_titles_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading archive titles from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_titles(&content, ext.as_str())
}

fn parse_titles(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("titles");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported archive format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlArchive {
        titles: Vec<String>,
    }
    let v: TomlArchive = toml::from_str(s)?;
    Ok(clean_list(v.titles))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blanks, keep first occurrence order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}
