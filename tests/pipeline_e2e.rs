// tests/pipeline_e2e.rs
//
// Full runs over scripted feeds and a scripted scorer: ordering, gate,
// duplicate annotation, ranking and the all-or-nothing failure behavior.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use topic_research::ingest::types::SourceFeed;
use topic_research::model::{InvariantViolation, NarrativeProposal};
use topic_research::scorer::{Scorer, DEFAULT_TAGS};
use topic_research::sink::{JsonFileSink, MemorySink};
use topic_research::{
    AnalyzedTopic, ArchiveIndex, Candidate, CredibilityTier, DuplicateDetector, KeywordExtractor,
    Phase, PipelineError, RankedResult, RankingEngine, RelevanceGate, ResearchPipeline,
};

struct ListFeed {
    name: &'static str,
    titles: Vec<&'static str>,
}

#[async_trait]
impl SourceFeed for ListFeed {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .titles
            .iter()
            .filter_map(|t| {
                Candidate::new(
                    *t,
                    format!("Zusammenfassung: {t}"),
                    self.name,
                    format!("https://example.test/{}", self.name),
                    CredibilityTier::Green,
                    None,
                )
            })
            .collect())
    }
    fn name(&self) -> &str {
        self.name
    }
}

struct DownFeed;

#[async_trait]
impl SourceFeed for DownFeed {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        Err(anyhow!("dns error: no such host"))
    }
    fn name(&self) -> &str {
        "Down"
    }
}

/// (relevance, tag count, visual rating) per title; missing titles are "not relevant".
struct ScriptedScorer {
    script: HashMap<&'static str, (u8, usize, u8)>,
    fail_on: Option<&'static str>,
    fixed_id: Option<u64>,
}

impl ScriptedScorer {
    fn new(script: &[(&'static str, (u8, usize, u8))]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            fail_on: None,
            fixed_id: None,
        }
    }
}

#[async_trait]
impl Scorer for ScriptedScorer {
    async fn score(&self, id: u64, c: &Candidate) -> Result<Option<AnalyzedTopic>> {
        if self.fail_on == Some(c.title.as_str()) {
            return Err(anyhow!("model returned garbage"));
        }
        let Some(&(relevance, n_tags, visual)) = self.script.get(c.title.as_str()) else {
            return Ok(None);
        };
        let tags = DEFAULT_TAGS
            .iter()
            .take(n_tags)
            .map(|t| t.to_string())
            .collect();
        Ok(Some(AnalyzedTopic::from_candidate(
            self.fixed_id.unwrap_or(id),
            c,
            tags,
            visual,
            relevance,
            NarrativeProposal::default(),
        )))
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

const A1: &str = "Elektroauto Batterie übersteht Wintertest";
const A2: &str = "Promi-Hochzeit in Kitzbühel";
const A3: &str = "Tiefsee Roboter filmt leuchtende Quallen";
const A4: &str = "Börsenbericht vom Dienstag";
const A5: &str = "Vulkanausbruch auf Island";
const C1: &str = "Bahnstreik angekündigt";
const C2: &str = "Leuchtende Pilze im Schwarzwald";

fn feeds() -> Vec<Box<dyn SourceFeed>> {
    vec![
        Box::new(ListFeed {
            name: "Tagesschau",
            titles: vec![A1, A2, A3, A4, A5],
        }),
        Box::new(DownFeed),
        Box::new(ListFeed {
            name: "ScienceDaily",
            titles: vec![C1, C2],
        }),
    ]
}

fn scorer() -> ScriptedScorer {
    ScriptedScorer::new(&[
        (A1, (9, 2, 4)),
        (A3, (7, 3, 5)),
        (A5, (6, 4, 5)),
        (C2, (8, 2, 5)),
    ])
}

fn detector() -> DuplicateDetector {
    let ex = KeywordExtractor::default();
    let idx = ArchiveIndex::from_titles(
        ["klimawandel grundlagen", "elektroauto batterie", "plastik im meer"],
        &ex,
    );
    DuplicateDetector::new(ex, idx)
}

fn pipeline(scorer: ScriptedScorer, out: &Path) -> ResearchPipeline {
    ResearchPipeline::new(
        feeds(),
        Arc::new(scorer),
        RelevanceGate::default(),
        detector(),
        RankingEngine,
        Box::new(JsonFileSink::new(out)),
    )
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-12-11T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn end_to_end_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data").join("topics.json");
    let mut p = pipeline(scorer(), &out);

    let report = p.run(now()).await.expect("run ok");
    assert_eq!(p.phase(), Phase::Idle);
    assert_eq!(report.fetched, 7);
    assert_eq!(report.failed_sources, vec!["Down".to_string()]);
    assert_eq!(report.relevant, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.unique, 2);
    assert_eq!(report.persisted, 3);

    let written: RankedResult = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(written.generated_at, now());
    let titles: Vec<_> = written.topics.iter().map(|t| t.title.as_str()).collect();
    // A3 has most tags; C2 beats A1 on visual rating.
    assert_eq!(titles, vec![A3, C2, A1]);
    // ids follow fetch order across sources (A1=1 .. A5=5, C1=6, C2=7)
    let ids: Vec<_> = written.topics.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![3, 7, 1]);

    let dup = &written.topics[2];
    assert!(dup.is_duplicate());
    assert_eq!(dup.duplicate_info(), "already covered");
    assert!(written.topics[..2].iter().all(|t| !t.is_duplicate()));
    assert!(written.topics[..2]
        .iter()
        .all(|t| t.duplicate_info() == "not yet covered"));

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert!(raw["lastUpdate"].as_str().unwrap().starts_with("2025-12-11T08:00:00"));
    assert!(raw["topics"][0]["tags"].is_array());
    assert!(raw["topics"][0]["sources"][0]["url"].is_string());
}

#[tokio::test]
async fn pipeline_can_run_again_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topics.json");
    let mut p = pipeline(scorer(), &out);

    let first = p.run(now()).await.unwrap();
    let bytes_first = fs::read(&out).unwrap();
    let second = p.run(now()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&out).unwrap(), bytes_first);
}

#[tokio::test]
async fn scoring_failure_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topics.json");
    fs::write(&out, b"{\"lastUpdate\":\"old\",\"topics\":[]}").unwrap();

    let mut s = scorer();
    s.fail_on = Some(C2);
    let mut p = pipeline(s, &out);

    let err = p.run(now()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Scoring { .. }));
    assert_eq!(err.phase(), Phase::Analyzing);
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("model returned garbage"));
    assert_eq!(p.phase(), Phase::Idle);
    assert_eq!(
        fs::read(&out).unwrap(),
        b"{\"lastUpdate\":\"old\",\"topics\":[]}"
    );
}

#[tokio::test]
async fn malformed_scorer_output_is_an_invariant_violation() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topics.json");

    let mut s = scorer();
    s.script.insert(A3, (7, 3, 9));
    let mut p = pipeline(s, &out);

    let err = p.run(now()).await.unwrap_err();
    match &err {
        PipelineError::Invariant { phase, violation } => {
            assert_eq!(*phase, Phase::Analyzing);
            assert!(matches!(
                violation,
                InvariantViolation::OutOfRange {
                    field: "visualRating",
                    value: 9,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out.exists());
}

#[tokio::test]
async fn scorer_must_use_assigned_id() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topics.json");

    let mut s = scorer();
    s.fixed_id = Some(42);
    let mut p = pipeline(s, &out);

    let err = p.run(now()).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Invariant {
            violation: InvariantViolation::UnexpectedId {
                expected: 1,
                got: 42
            },
            ..
        }
    ));
    assert!(!out.exists());
}

#[tokio::test]
async fn persistence_failure_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topics.json");
    fs::write(&out, b"previous").unwrap();
    // Block the temp file path so the write fails before the rename.
    fs::create_dir(dir.path().join("topics.json.tmp")).unwrap();

    let mut p = pipeline(scorer(), &out);
    let err = p.run(now()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persistence(_)));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(fs::read(&out).unwrap(), b"previous");
}

#[tokio::test]
async fn all_sources_down_still_persists_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("topics.json");
    let mut p = ResearchPipeline::new(
        vec![Box::new(DownFeed), Box::new(DownFeed)],
        Arc::new(scorer()),
        RelevanceGate::default(),
        detector(),
        RankingEngine,
        Box::new(JsonFileSink::new(&out)),
    );

    let report = p.run(now()).await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(report.failed_sources.len(), 2);
    assert_eq!(report.persisted, 0);
    let written: RankedResult = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert!(written.topics.is_empty());
}

#[tokio::test]
async fn sink_receives_one_ranked_batch_per_run() {
    let sink = MemorySink::new();
    let mut p = ResearchPipeline::new(
        feeds(),
        Arc::new(scorer()),
        RelevanceGate::default(),
        detector(),
        RankingEngine,
        Box::new(sink.clone()),
    );

    p.run(now()).await.unwrap();
    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].generated_at, now());
    let titles: Vec<_> = calls[0].topics.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec![A3, C2, A1]);
    assert!(calls[0].topics.iter().all(|t| t.duplicate_checked()));

    let mut s = scorer();
    s.fail_on = Some(A1);
    let failing = MemorySink::new();
    let mut p = ResearchPipeline::new(
        feeds(),
        Arc::new(s),
        RelevanceGate::default(),
        detector(),
        RankingEngine,
        Box::new(failing.clone()),
    );
    assert!(p.run(now()).await.is_err());
    assert!(failing.calls().is_empty());
}
