//! Model-backed rule extraction.
//!
//! Sends each retrieved chunk to the chat model with a bilingual prompt and
//! parses the JSON it returns into candidates. Malformed model output is
//! logged and treated as "no rules in this chunk" rather than failing the
//! run: one bad completion must not sink a whole document.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use rulegap_core::extract::{blend_confidence, RuleExtractor};
use rulegap_core::models::{CandidateRule, ExtractionMethod, RetrievedChunk};

use crate::llm::{first_json_object, ChatClient};

const SYSTEM_PROMPT: &str = "You are a financial compliance analyst. You extract explicit, \
verifiable regulatory rules from Arabic and English government payment documents. A rule is a \
single obligation, prohibition, or verification requirement stated in the text. Respond with \
JSON only, no commentary.";

pub struct ModelExtractor {
    client: ChatClient,
    track_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModelPayload {
    #[serde(default)]
    rules: Vec<ModelRule>,
}

#[derive(Debug, Deserialize)]
struct ModelRule {
    text: String,
    #[serde(default)]
    track: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl ModelExtractor {
    pub fn new(client: ChatClient, track_ids: Vec<String>) -> Self {
        Self { client, track_ids }
    }

    fn user_prompt(&self, chunk: &RetrievedChunk) -> String {
        format!(
            "Known tracks: {}.\n\
             Retrieval query: {}\n\n\
             Extract every explicit rule from the following passage. Keep each rule in its \
             original language, verbatim where possible. Return JSON of the form \
             {{\"rules\": [{{\"text\": \"...\", \"track\": \"one of the known tracks or null\", \
             \"confidence\": 0.0}}]}}. Return {{\"rules\": []}} if the passage states no rules.\n\n\
             Passage:\n{}",
            self.track_ids.join(", "),
            chunk.query,
            chunk.chunk.text
        )
    }
}

/// Parse one completion into candidates. Unknown tracks are dropped to
/// `None`, confidences default to 0.5 and are clamped before blending with
/// the retrieval score.
fn parse_candidates(raw: &str, chunk: &RetrievedChunk, track_ids: &[String]) -> Vec<CandidateRule> {
    let json = match first_json_object(raw) {
        Some(json) => json,
        None => {
            tracing::warn!(chunk = %chunk.chunk.id, "model returned no JSON object");
            return Vec::new();
        }
    };
    let payload: ModelPayload = match serde_json::from_str(json) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(chunk = %chunk.chunk.id, error = %err, "unparseable model JSON");
            return Vec::new();
        }
    };

    payload
        .rules
        .into_iter()
        .filter_map(|rule| {
            let text = rule.text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let model_confidence = rule.confidence.unwrap_or(0.5).clamp(0.0, 1.0);
            let suggested_track = rule
                .track
                .filter(|t| track_ids.iter().any(|known| known == t));
            Some(CandidateRule {
                text,
                chunk: chunk.clone(),
                confidence: blend_confidence(model_confidence, chunk.score),
                method: ExtractionMethod::Model,
                suggested_track,
            })
        })
        .collect()
}

#[async_trait]
impl RuleExtractor for ModelExtractor {
    async fn extract(&self, chunk: &RetrievedChunk) -> Result<Vec<CandidateRule>> {
        let raw = self
            .client
            .complete(SYSTEM_PROMPT, &self.user_prompt(chunk))
            .await?;
        Ok(parse_candidates(&raw, chunk, &self.track_ids))
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Model
    }
}
