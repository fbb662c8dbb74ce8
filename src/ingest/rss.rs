// src/ingest/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::normalize_text;
use crate::ingest::types::SourceFeed;
use crate::model::{Candidate, CredibilityTier};

/// Newest entries taken per source.
pub const DEFAULT_MAX_ITEMS: usize = 50;
/// Entries older than this are skipped.
pub const DEFAULT_DAYS_BACK: u32 = 14;
/// Largest window the config layer accepts (100 years).
pub const MAX_DAYS_BACK: u32 = 36_500;

const USER_AGENT: &str = "topic-research/0.1 (editorial research bot)";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// Per-source feed settings.
#[derive(Debug, Clone)]
pub struct RssFeedOptions {
    pub max_items: usize,
    pub days_back: u32,
}

impl Default for RssFeedOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            days_back: DEFAULT_DAYS_BACK,
        }
    }
}

/// RSS 2.0 source.
pub struct RssFeed {
    name: String,
    credibility: CredibilityTier,
    opts: RssFeedOptions,
    mode: Mode,
}

impl RssFeed {
    /// Parse a fixed XML document instead of fetching (tests, offline runs).
    pub fn from_fixture(
        name: impl Into<String>,
        credibility: CredibilityTier,
        xml: &str,
        opts: RssFeedOptions,
    ) -> Self {
        Self {
            name: name.into(),
            credibility,
            opts,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(
        name: impl Into<String>,
        credibility: CredibilityTier,
        url: impl Into<String>,
        opts: RssFeedOptions,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building feed http client")?;
        Ok(Self {
            name: name.into(),
            credibility,
            opts,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    /// Parse `xml` relative to `now`, applying the item cap and age cutoff.
    pub fn parse_items(&self, xml: &str, now: DateTime<Utc>) -> Result<Vec<Candidate>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(&scrub_html_entities_for_xml(xml))
            .with_context(|| format!("parsing rss xml for {}", self.name))?;

        // A window reaching past chrono's range means no cutoff at all.
        let cutoff = TimeDelta::try_days(i64::from(self.opts.days_back))
            .and_then(|d| now.checked_sub_signed(d));
        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(self.opts.max_items) {
            let published_at = it.pub_date.as_deref().and_then(parse_rfc2822);
            if matches!((published_at, cutoff), (Some(p), Some(c)) if p < c) {
                continue;
            }
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let summary = normalize_text(it.description.as_deref().unwrap_or_default());
            let Some(c) = Candidate::new(
                title,
                summary,
                self.name.clone(),
                it.link.unwrap_or_default(),
                self.credibility,
                published_at,
            ) else {
                continue;
            };
            out.push(c);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("research_feed_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl SourceFeed for RssFeed {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s, Utc::now()),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .with_context(|| format!("{} http get()", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_items(&body, Utc::now())
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// quick-xml knows only the five XML entities; map common HTML ones first.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&bdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
