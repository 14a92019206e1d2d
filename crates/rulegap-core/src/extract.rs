//! Rule extraction contract and the pattern-based fallback.
//!
//! [`RuleExtractor`] is implemented twice: a model-backed extractor in the
//! application crate, and [`PatternExtractor`] here — always available, zero
//! external dependencies. Both produce the same [`CandidateRule`] shape, so
//! the deduplicator and mapper never care which one ran.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::models::{CandidateRule, ExtractionMethod, RetrievedChunk};

/// Weight of the model's self-reported confidence in the blended score.
pub const MODEL_CONFIDENCE_WEIGHT: f64 = 0.7;
/// Weight of the chunk's retrieval score in the blended score.
pub const RETRIEVAL_SCORE_WEIGHT: f64 = 0.3;

/// Fixed confidence for pattern-based candidates. Deliberately lower than
/// any model-based extraction, reflecting the lower precision of lexical
/// matching.
pub const PATTERN_CONFIDENCE: f64 = 0.35;

/// Minimum candidate length in characters; shorter matches are fragments.
const MIN_RULE_LEN: usize = 20;

/// Blend a model's self-reported confidence with the retrieval score of the
/// chunk it read, clamped to `[0, 1]`.
pub fn blend_confidence(model_confidence: f64, retrieval_score: f64) -> f64 {
    (MODEL_CONFIDENCE_WEIGHT * model_confidence + RETRIEVAL_SCORE_WEIGHT * retrieval_score)
        .clamp(0.0, 1.0)
}

/// Turns one retrieved chunk into zero or more candidate rules.
#[async_trait]
pub trait RuleExtractor: Send + Sync {
    async fn extract(&self, chunk: &RetrievedChunk) -> Result<Vec<CandidateRule>>;
    fn method(&self) -> ExtractionMethod;
}

/// Lexical fallback extractor: segments a chunk into sentences and keeps
/// those carrying obligation markers or numeric-threshold phrasing, in both
/// Arabic and English.
pub struct PatternExtractor {
    markers: Vec<Regex>,
}

impl PatternExtractor {
    pub fn new() -> Self {
        let patterns = [
            // Arabic obligation and verification markers.
            r"يجب",
            r"لا\s+يجوز",
            r"يشترط",
            r"التحقق\s+من",
            r"على\s+\S+.*\s+أن",
            // English modals and threshold phrasing.
            r"(?i)\bmust\b",
            r"(?i)\bshall\b",
            r"(?i)\bmay\s+not\b",
            r"(?i)\brequired\b",
            r"(?i)\bprohibited\b",
            r"(?i)\bnot\s+exceed\b",
            r"(?i)\bat\s+least\b",
            r"(?i)\bno\s+more\s+than\b",
        ];
        Self {
            markers: patterns
                .iter()
                .map(|p| Regex::new(p).expect("static pattern"))
                .collect(),
        }
    }

    fn is_rule_sentence(&self, sentence: &str) -> bool {
        self.markers.iter().any(|m| m.is_match(sentence))
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into sentences on Arabic and English terminators and newlines.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '؟', '۔', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl RuleExtractor for PatternExtractor {
    async fn extract(&self, chunk: &RetrievedChunk) -> Result<Vec<CandidateRule>> {
        let candidates = split_sentences(&chunk.chunk.text)
            .into_iter()
            .filter(|s| s.chars().count() >= MIN_RULE_LEN && self.is_rule_sentence(s))
            .map(|sentence| CandidateRule {
                text: sentence.to_string(),
                chunk: chunk.clone(),
                confidence: PATTERN_CONFIDENCE,
                method: ExtractionMethod::Pattern,
                suggested_track: None,
            })
            .collect();
        Ok(candidates)
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, RetrievedChunk};

    fn retrieved(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: "c1".to_string(),
                document_id: "d1".to_string(),
                index: 0,
                text: text.to_string(),
                overlap_len: 0,
                hash: String::new(),
                document_name: "doc".to_string(),
                source_url: None,
            },
            score: 0.8,
            query: "q".to_string(),
            track_id: "salaries".to_string(),
        }
    }

    #[test]
    fn test_blend_confidence_weights_and_clamp() {
        assert!((blend_confidence(1.0, 1.0) - 1.0).abs() < 1e-9);
        assert!((blend_confidence(0.5, 0.0) - 0.35).abs() < 1e-9);
        assert_eq!(blend_confidence(5.0, 5.0), 1.0);
        assert_eq!(blend_confidence(-1.0, 0.0), 0.0);
    }

    #[tokio::test]
    async fn test_english_obligation_sentence_extracted() {
        let ex = PatternExtractor::new();
        let out = ex
            .extract(&retrieved(
                "Some context here. The deduction must not exceed one third of base salary. Unrelated filler text follows here.",
            ))
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].text.contains("must not exceed"));
        assert_eq!(out[0].method, ExtractionMethod::Pattern);
        assert!((out[0].confidence - PATTERN_CONFIDENCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_arabic_markers_extracted() {
        let ex = PatternExtractor::new();
        let out = ex
            .extract(&retrieved(
                "التحقق من أن مجموع الحسميات لا يتجاوز ثلث الراتب الأساسي. لا يجوز تكرار الصرف لنفس العملية.",
            ))
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_short_fragments_dropped() {
        let ex = PatternExtractor::new();
        let out = ex.extract(&retrieved("You must go. OK then.")).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_no_markers_no_candidates() {
        let ex = PatternExtractor::new();
        let out = ex
            .extract(&retrieved(
                "This paragraph merely describes background history of the agency and its founding.",
            ))
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
