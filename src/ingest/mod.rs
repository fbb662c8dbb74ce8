// src/ingest/mod.rs
pub mod rss;
pub mod types;

use crate::ingest::types::{FetchOutcome, SourceFeed};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "research_fetched_total",
            "Candidates returned by all sources."
        );
        describe_counter!(
            "research_source_errors_total",
            "Source fetch/parse errors."
        );
        describe_histogram!("research_feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, unify quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » „ to ASCII quotes
    out = out
        .replace(
            ['\u{201C}', '\u{201D}', '\u{201E}', '\u{00AB}', '\u{00BB}'],
            "\"",
        )
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Poll every feed and merge the results in declaration order.
///
/// Feeds are polled concurrently; a failing feed is logged and contributes
/// zero candidates.
pub async fn fetch_all(feeds: &[Box<dyn SourceFeed>]) -> FetchOutcome {
    ensure_metrics_described();

    let results = join_all(feeds.iter().map(|f| f.fetch_latest())).await;

    let mut out = FetchOutcome::default();
    for (feed, res) in feeds.iter().zip(results) {
        match res {
            Ok(mut v) => {
                tracing::info!(target: "ingest", source = feed.name(), count = v.len(), "source fetched");
                out.candidates.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = feed.name(), "source unavailable");
                counter!("research_source_errors_total").increment(1);
                out.failed_sources.push(feed.name().to_string());
            }
        }
    }

    counter!("research_fetched_total").increment(out.candidates.len() as u64);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candidate, CredibilityTier};
    use anyhow::{anyhow, Result};
    use std::time::Duration;

    struct StaticFeed {
        name: &'static str,
        titles: Vec<&'static str>,
        delay_ms: u64,
    }

    #[async_trait::async_trait]
    impl SourceFeed for StaticFeed {
        async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(self
                .titles
                .iter()
                .filter_map(|t| {
                    Candidate::new(*t, "", self.name, "", CredibilityTier::Green, None)
                })
                .collect())
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    struct BrokenFeed;

    #[async_trait::async_trait]
    impl SourceFeed for BrokenFeed {
        async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
            Err(anyhow!("connection refused"))
        }
        fn name(&self) -> &str {
            "Broken"
        }
    }

    #[test]
    fn normalize_text_strips_markup_and_collapses_ws() {
        let s = "  <p>Hallo,&nbsp;&nbsp; <b>Welt</b> &bdquo;ok&ldquo;</p>  ";
        assert_eq!(normalize_text(s), r#"Hallo, Welt "ok""#);
    }

    #[test]
    fn normalize_text_keeps_sentence_punctuation() {
        assert_eq!(normalize_text("Was steckt dahinter?"), "Was steckt dahinter?");
    }

    #[tokio::test]
    async fn merge_keeps_declaration_order_despite_latency() {
        let feeds: Vec<Box<dyn SourceFeed>> = vec![
            Box::new(StaticFeed {
                name: "Slow",
                titles: vec!["a1", "a2"],
                delay_ms: 30,
            }),
            Box::new(BrokenFeed),
            Box::new(StaticFeed {
                name: "Fast",
                titles: vec!["b1"],
                delay_ms: 0,
            }),
        ];
        let out = fetch_all(&feeds).await;
        let titles: Vec<_> = out.candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "a2", "b1"]);
        assert_eq!(out.failed_sources, vec!["Broken".to_string()]);
    }
}
