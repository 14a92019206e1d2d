//! Core data models for the rule extraction pipeline.
//!
//! These types represent the documents, chunks, candidate rules, canonical
//! rules, and gap records that flow through one processing run. Everything
//! that leaves the pipeline ([`ExtractedRule`], [`Gap`], [`ExtractionResult`])
//! serializes to flat JSON-friendly structures so the surrounding application
//! can persist or display it without further shaping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Parsed,
    Failed,
}

/// A document handed to the pipeline: already-parsed plain text plus
/// identity and source metadata. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub source_url: Option<String>,
    /// Working language of the text: `"ar"`, `"en"`, or `"mixed"`.
    pub language: String,
    pub text: String,
    pub status: DocumentStatus,
}

impl Document {
    /// Create a parsed document from plain text, detecting its language tag.
    pub fn new(name: &str, source_url: Option<String>, text: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            source_url,
            language: detect_language(text).to_string(),
            text: text.to_string(),
            status: DocumentStatus::Parsed,
        }
    }
}

/// Classify text as Arabic, English, or mixed by the share of Arabic
/// codepoints among its letters.
pub fn detect_language(text: &str) -> &'static str {
    let mut arabic = 0usize;
    let mut latin = 0usize;
    for c in text.chars() {
        if ('\u{0600}'..='\u{06FF}').contains(&c) {
            arabic += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }
    let total = arabic + latin;
    if total == 0 {
        return "mixed";
    }
    let ratio = arabic as f64 / total as f64;
    if ratio > 0.8 {
        "ar"
    } else if ratio < 0.2 {
        "en"
    } else {
        "mixed"
    }
}

/// A bounded text segment of a document, with controlled overlap to its
/// predecessor. Chunks are ephemeral: they live inside the vector store for
/// the duration of one processing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    /// 0-based sequence index within the document.
    pub index: usize,
    pub text: String,
    /// Number of characters shared with the end of the previous chunk.
    pub overlap_len: usize,
    /// SHA-256 of the chunk text, for staleness/idempotency checks.
    pub hash: String,
    pub document_name: String,
    pub source_url: Option<String>,
}

/// Opaque handle binding an indexed chunk set to a retrievable collection.
///
/// A handle is only returned once indexing has completed, so any handle the
/// caller holds refers to a fully populated index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHandle {
    pub id: String,
    pub document_id: String,
}

/// A chunk returned from retrieval: the chunk, its relevance score in
/// `[0, 1]`, and the track-scoped query that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f64,
    pub query: String,
    /// Track that owned the producing query.
    pub track_id: String,
}

/// How a candidate rule was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Model,
    Pattern,
}

/// Raw extraction output before deduplication: one proposed rule statement
/// tied to the retrieved chunk it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRule {
    pub text: String,
    pub chunk: RetrievedChunk,
    /// Per-extraction confidence in `[0, 1]`.
    pub confidence: f64,
    pub method: ExtractionMethod,
    /// Track proposed by the extractor itself, if any (model path only).
    pub suggested_track: Option<String>,
}

/// Lifecycle status of a canonical extracted rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Extracted,
    Mapped,
    RequiresReview,
}

/// Traceability record pointing back at the exact source of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub document_name: String,
    pub document_url: Option<String>,
    /// Index of the chunk the canonical text was taken from.
    pub chunk_index: usize,
    /// Confidence at extraction time.
    pub confidence: f64,
    /// Query that retrieved the source chunk, for audit trails.
    pub query: Option<String>,
}

/// A canonical, deduplicated rule: the single representative of a cluster of
/// near-identical candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRule {
    /// Stable within one processing run.
    pub rule_id: String,
    pub text: String,
    /// Assigned track; `None` until mapped.
    pub track_id: Option<String>,
    /// Mapping confidence in `[0, 1]`.
    pub mapping_confidence: f64,
    pub status: RuleStatus,
    pub method: ExtractionMethod,
    pub source: SourceReference,
    /// All chunk indices that contributed members to the duplicate cluster.
    pub provenance_chunks: Vec<usize>,
    /// Track of the retrieval query behind the kept member, used as the
    /// primary mapping signal.
    pub origin_track: Option<String>,
}

/// Classified discrepancy between extracted rules and a track baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    Missing,
    Partial,
    Conflicting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A classified gap for one baseline rule of one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub gap_id: String,
    pub track_id: String,
    /// Baseline rule this gap concerns.
    pub baseline_rule_id: String,
    /// Best-matching extracted rule, when one exists above the weak band.
    pub extracted_rule: Option<ExtractedRule>,
    pub gap_type: GapType,
    pub severity: Severity,
    /// Templated, deterministic recommendation text.
    pub recommendation: String,
    /// Baseline rule ids judged similar to the triggering extracted rule.
    pub similar_baseline_rules: Vec<String>,
}

/// Run-level aggregate handed back to the caller. The core produces it but
/// never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub document_name: String,
    pub rules: Vec<ExtractedRule>,
    pub gaps: Vec<Gap>,
    pub stats: crate::stats::RunStats,
    pub elapsed_seconds: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_arabic() {
        assert_eq!(detect_language("يجب التحقق من الفواتير"), "ar");
    }

    #[test]
    fn test_detect_language_english() {
        assert_eq!(detect_language("the deduction must not exceed one third"), "en");
    }

    #[test]
    fn test_detect_language_empty() {
        assert_eq!(detect_language(""), "mixed");
        assert_eq!(detect_language("123 456"), "mixed");
    }

    #[test]
    fn test_document_new_is_parsed() {
        let doc = Document::new("circular", None, "some text");
        assert_eq!(doc.status, DocumentStatus::Parsed);
        assert!(!doc.id.is_empty());
    }

    #[test]
    fn test_rule_roundtrips_through_json() {
        let rule = ExtractedRule {
            rule_id: "doc-r001".to_string(),
            text: "invoices must match the claimed amounts".to_string(),
            track_id: Some("invoices".to_string()),
            mapping_confidence: 0.82,
            status: RuleStatus::Mapped,
            method: ExtractionMethod::Pattern,
            source: SourceReference {
                document_name: "circular".to_string(),
                document_url: None,
                chunk_index: 3,
                confidence: 0.35,
                query: Some("invoice rules".to_string()),
            },
            provenance_chunks: vec![3, 4],
            origin_track: Some("invoices".to_string()),
        };
        let json = serde_json::to_string(&rule).unwrap();
        let back: ExtractedRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rule_id, rule.rule_id);
        assert_eq!(back.status, RuleStatus::Mapped);
        assert_eq!(back.provenance_chunks, vec![3, 4]);
    }
}
