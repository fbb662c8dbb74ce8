// src/config.rs
//! Run configuration loaded from TOML.
//!
//! Resolution: `$RESEARCH_CONFIG_PATH` (must exist) → `config/research.toml`
//! → built-in `default_seed()`. Env overrides for the relevance threshold and
//! output path are applied on top.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{load_archive_titles_from, DEFAULT_MIN_SHARED_KEYWORDS};
use crate::ingest::rss::{DEFAULT_DAYS_BACK, DEFAULT_MAX_ITEMS, MAX_DAYS_BACK};
use crate::keywords::DEFAULT_STOP_WORDS;
use crate::model::CredibilityTier;
use crate::relevance::{parse_min_relevance_env, DEFAULT_MIN_RELEVANCE, ENV_MIN_RELEVANCE};
use crate::scorer::openai::DEFAULT_MODEL;
use crate::scorer::DEFAULT_TAGS;
use crate::sink::DEFAULT_OUTPUT_PATH;

pub const DEFAULT_CONFIG_PATH: &str = "config/research.toml";
pub const ENV_CONFIG_PATH: &str = "RESEARCH_CONFIG_PATH";
pub const ENV_OUTPUT_PATH: &str = "RESEARCH_OUTPUT_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub archive: ArchiveSection,
    #[serde(default)]
    pub keywords: KeywordsSection,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub min_relevance: u8,
    pub min_shared_keywords: usize,
    pub days_back: u32,
    pub max_items_per_source: usize,
    pub output_path: PathBuf,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            min_relevance: DEFAULT_MIN_RELEVANCE,
            min_shared_keywords: DEFAULT_MIN_SHARED_KEYWORDS,
            days_back: DEFAULT_DAYS_BACK,
            max_items_per_source: DEFAULT_MAX_ITEMS,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub credibility: CredibilityTier,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    /// Inline titles of already covered topics.
    pub titles: Vec<String>,
    /// Optional file with more titles (TOML `titles = [...]` or JSON array).
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordsSection {
    pub stop_words: Vec<String>,
}

impl Default for KeywordsSection {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// "heuristic" | "openai"
    pub provider: String,
    pub model: String,
    /// Controlled tag vocabulary.
    pub tags: Vec<String>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: DEFAULT_MODEL.to_string(),
            tags: DEFAULT_TAGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ResearchConfig {
    /// Resolve the config file, parse it and apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::load_from(&pb)?
            }
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from(&default)?
                } else {
                    tracing::info!(target: "config", "no config file found; using built-in defaults");
                    Self::default_seed()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading research config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing research config {}", path.display()))?;
        // Relative archive paths are resolved against the config file.
        if let (Some(p), Some(dir)) = (cfg.archive.path.as_mut(), path.parent()) {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        }
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.pipeline.min_relevance) {
            return Err(anyhow!(
                "pipeline.min_relevance must be within 1..=10, got {}",
                self.pipeline.min_relevance
            ));
        }
        if self.pipeline.min_shared_keywords == 0 {
            return Err(anyhow!("pipeline.min_shared_keywords must be at least 1"));
        }
        if !(1..=MAX_DAYS_BACK).contains(&self.pipeline.days_back) {
            return Err(anyhow!(
                "pipeline.days_back must be within 1..={MAX_DAYS_BACK}, got {}",
                self.pipeline.days_back
            ));
        }
        if self.scorer.tags.iter().all(|t| t.trim().is_empty()) {
            return Err(anyhow!("scorer.tags must not be empty"));
        }
        for s in &self.sources {
            if s.name.trim().is_empty() || s.url.trim().is_empty() {
                return Err(anyhow!("every source needs a name and a url"));
            }
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_min_relevance_env(std::env::var(ENV_MIN_RELEVANCE).ok()) {
            self.pipeline.min_relevance = t;
        }
        if let Ok(p) = std::env::var(ENV_OUTPUT_PATH) {
            if !p.trim().is_empty() {
                self.pipeline.output_path = PathBuf::from(p.trim());
            }
        }
    }

    /// Inline titles followed by the ones from `archive.path`, if set.
    pub fn archive_titles(&self) -> Result<Vec<String>> {
        let mut titles = self.archive.titles.clone();
        if let Some(p) = &self.archive.path {
            titles.extend(load_archive_titles_from(p)?);
        }
        Ok(titles)
    }

    /// Built-in sources, archive and vocabulary.
    pub fn default_seed() -> Self {
        let sources = [
            ("Tagesschau", "https://www.tagesschau.de/xml/rss2/", CredibilityTier::Green),
            (
                "Der Spiegel",
                "https://www.spiegel.de/schlagzeilen/index.rss",
                CredibilityTier::Green,
            ),
            ("Zeit Online", "https://newsfeed.zeit.de/index", CredibilityTier::Green),
            (
                "ScienceDaily",
                "https://www.sciencedaily.com/rss/all.xml",
                CredibilityTier::Green,
            ),
            (
                "Bild",
                "https://www.bild.de/rssfeeds/vw-home/vw-home-16725562,view=rss2.bild.xml",
                CredibilityTier::Yellow,
            ),
        ]
        .into_iter()
        .map(|(name, url, credibility)| SourceConfig {
            name: name.to_string(),
            url: url.to_string(),
            credibility,
        })
        .collect();

        let titles = [
            "klimawandel grundlagen",
            "elektroauto batterie",
            "künstliche intelligenz basics",
            "plastik im meer",
            "corona impfung",
            "schwarze löcher einführung",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            pipeline: PipelineSection::default(),
            sources,
            archive: ArchiveSection { titles, path: None },
            keywords: KeywordsSection::default(),
            scorer: ScorerConfig::default(),
        }
    }
}
