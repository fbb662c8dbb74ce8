// src/scorer/openai.rs
//! LLM scorer backed by the OpenAI Chat Completions API.
//!
//! The model answers with a JSON object; anything that fails to arrive or to
//! parse is an error, never a silent "not relevant".

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use super::{Scorer, TagVocabulary};
use crate::model::{AnalyzedTopic, Candidate, NarrativeProposal};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Shape the model is asked to produce. Ratings are read as plain numbers
/// (models answer `7.5` or `300` now and then) and clamped later.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysis {
    pub relevant: bool,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visual_rating: f64,
    #[serde(default)]
    pub visual_reason: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub narrative_proposal: Option<NarrativeProposal>,
}

pub struct OpenAiScorer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    vocabulary: TagVocabulary,
}

impl OpenAiScorer {
    pub fn new(api_key: String, model: &str, vocabulary: TagVocabulary) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("topic-research/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building openai http client")?;
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.trim().to_string()
        };
        Ok(Self {
            http,
            api_key,
            model,
            vocabulary,
        })
    }

    fn system_prompt(&self) -> String {
        format!(
            "You assess news items for a popular-science TV magazine. \
             Criteria: entertaining knowledge transfer, filmable on location, socially relevant \
             or entertaining, interesting for a broad audience. \
             Answer with ONE JSON object: {{\"relevant\": bool, \"relevanceScore\": 1-10, \
             \"tags\": [..] (only from: {}), \"visualRating\": 1-5, \"visualReason\": string, \
             \"summary\": string, \"narrativeProposal\": {{\"durationEstimate\": string, \
             \"segments\": [string], \"locations\": [string], \"roles\": [string], \
             \"dramaticArc\": string}}}}.",
            self.vocabulary.as_slice().join(", ")
        )
    }

    async fn complete(&self, candidate: &Candidate) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = self.system_prompt();
        let user = format!(
            "Title: {}\nSummary: {}\nSource: {} ({})",
            candidate.title, candidate.summary, candidate.source_name, candidate.credibility
        );
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp: Resp = self
            .http
            .post(ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("openai request")?
            .json()
            .await
            .context("openai response body")?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("openai returned no choices"))
    }

    /// Turn the model's answer into a topic. Out-of-vocabulary tags are dropped,
    /// ratings are clamped into their ranges.
    pub fn topic_from_analysis(
        &self,
        id: u64,
        candidate: &Candidate,
        analysis: LlmAnalysis,
    ) -> Option<AnalyzedTopic> {
        if !analysis.relevant {
            return None;
        }
        let tags: BTreeSet<String> = self.vocabulary.restrict(&analysis.tags);
        if tags.is_empty() {
            tracing::debug!(target: "scorer", id, "no known tags; treating as not relevant");
            return None;
        }
        let mut topic = AnalyzedTopic::from_candidate(
            id,
            candidate,
            tags,
            clamp_rating(analysis.visual_rating, 1, 5),
            clamp_rating(analysis.relevance_score, 1, 10),
            analysis.narrative_proposal.unwrap_or_default(),
        );
        topic.visual_reason = analysis.visual_reason;
        if let Some(s) = analysis.summary.filter(|s| !s.trim().is_empty()) {
            topic.summary = s;
        }
        Some(topic)
    }
}

/// Round to the nearest integer inside `lo..=hi`; NaN maps to `lo`.
fn clamp_rating(v: f64, lo: u8, hi: u8) -> u8 {
    if v.is_nan() {
        return lo;
    }
    v.round().clamp(f64::from(lo), f64::from(hi)) as u8
}

#[async_trait::async_trait]
impl Scorer for OpenAiScorer {
    async fn score(&self, id: u64, candidate: &Candidate) -> Result<Option<AnalyzedTopic>> {
        let content = self.complete(candidate).await?;
        let analysis: LlmAnalysis = serde_json::from_str(&content)
            .with_context(|| format!("parsing model answer for `{}`", candidate.title))?;
        Ok(self.topic_from_analysis(id, candidate, analysis))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
