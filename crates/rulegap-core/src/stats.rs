//! Per-run counters surfaced alongside the extraction result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{ExtractedRule, ExtractionMethod, Gap, GapType, RuleStatus};

/// Aggregate counters for one document run. Purely descriptive; nothing in
/// the pipeline branches on these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub chunks_indexed: usize,
    /// Merged retrieval hits across all tracks and queries.
    pub chunks_retrieved: usize,
    /// Raw candidates before deduplication.
    pub candidates_extracted: usize,
    pub rules_after_dedup: usize,
    pub rules_mapped: usize,
    pub rules_requiring_review: usize,
    /// Quality signal: how many final rules came from each extraction path.
    pub rules_from_model: usize,
    pub rules_from_pattern: usize,
    pub avg_mapping_confidence: f64,
    /// Set when retrieval fell back from embeddings to keyword scoring.
    pub retrieval_degraded: bool,
    /// Set when at least one chunk fell back from model extraction to
    /// pattern matching.
    pub extraction_degraded: bool,
    pub gaps_total: usize,
    pub gaps_missing: usize,
    pub gaps_partial: usize,
    pub gaps_conflicting: usize,
    pub rules_per_track: BTreeMap<String, usize>,
    pub gaps_per_track: BTreeMap<String, usize>,
}

impl RunStats {
    /// Fold the final rule set into the counters.
    pub fn record_rules(&mut self, rules: &[ExtractedRule]) {
        self.rules_after_dedup = rules.len();
        let mut confidence_sum = 0.0;
        for rule in rules {
            match rule.status {
                RuleStatus::Mapped => self.rules_mapped += 1,
                RuleStatus::RequiresReview => self.rules_requiring_review += 1,
                RuleStatus::Extracted => {}
            }
            match rule.method {
                ExtractionMethod::Model => self.rules_from_model += 1,
                ExtractionMethod::Pattern => self.rules_from_pattern += 1,
            }
            confidence_sum += rule.mapping_confidence;
            if let Some(track) = &rule.track_id {
                *self.rules_per_track.entry(track.clone()).or_insert(0) += 1;
            }
        }
        if !rules.is_empty() {
            self.avg_mapping_confidence = confidence_sum / rules.len() as f64;
        }
    }

    /// Fold the classified gaps into the counters.
    pub fn record_gaps(&mut self, gaps: &[Gap]) {
        self.gaps_total = gaps.len();
        for gap in gaps {
            match gap.gap_type {
                GapType::Missing => self.gaps_missing += 1,
                GapType::Partial => self.gaps_partial += 1,
                GapType::Conflicting => self.gaps_conflicting += 1,
            }
            *self.gaps_per_track.entry(gap.track_id.clone()).or_insert(0) += 1;
        }
    }
}
