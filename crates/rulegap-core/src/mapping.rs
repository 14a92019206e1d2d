//! Track mapping: assign each canonical rule to a business track.
//!
//! The primary signal is the track that owned the retrieval query behind the
//! rule (or the track the extractor proposed). Keyword affinity against the
//! catalog then scales confidence, so a rule dragged in by an off-topic query
//! still ends up flagged for review. Rules without an origin fall back to a
//! pure keyword vote, capped low because lexical overlap alone is weak
//! evidence.

use crate::models::{ExtractedRule, RuleStatus};
use crate::similarity::normalize_text;
use crate::tracks::{FinancialTrack, TrackCatalog};

/// Base confidence for an origin-track assignment with full keyword affinity.
const ORIGIN_BASE_CONFIDENCE: f64 = 0.9;
/// Floor share of the base kept when no keyword corroborates the origin.
const ORIGIN_FLOOR_SHARE: f64 = 0.55;
/// Keyword hits at which affinity saturates.
const AFFINITY_SATURATION: f64 = 3.0;
/// Ceiling for assignments derived from keywords alone.
const KEYWORD_ONLY_CAP: f64 = 0.6;

/// Count catalog keywords occurring in the normalized rule text. Substring
/// matching is intentional: Arabic keywords must hit through the definite
/// article and suffixes.
fn keyword_hits(track: &FinancialTrack, normalized_text: &str) -> usize {
    track
        .keywords
        .iter()
        .filter(|kw| normalized_text.contains(normalize_text(kw).as_str()))
        .count()
}

fn origin_confidence(hits: usize) -> f64 {
    let affinity = (hits as f64 / AFFINITY_SATURATION).min(1.0);
    ORIGIN_BASE_CONFIDENCE * (ORIGIN_FLOOR_SHARE + (1.0 - ORIGIN_FLOOR_SHARE) * affinity)
}

/// Assign tracks and confidences to the deduplicated rule set.
///
/// Every rule leaves either `mapped` or `requires_review`; the status
/// `extracted` never survives this pass.
pub fn map_rules(
    rules: Vec<ExtractedRule>,
    catalog: &TrackCatalog,
    review_threshold: f64,
) -> Vec<ExtractedRule> {
    rules
        .into_iter()
        .map(|mut rule| {
            let normalized = normalize_text(&rule.text);

            let assignment = match rule.origin_track.as_deref().and_then(|t| catalog.get(t)) {
                Some(track) => {
                    let hits = keyword_hits(track, &normalized);
                    Some((track.track_id.clone(), origin_confidence(hits)))
                }
                None => catalog
                    .tracks
                    .iter()
                    .map(|track| (track, keyword_hits(track, &normalized)))
                    .max_by_key(|(_, hits)| *hits)
                    .filter(|(_, hits)| *hits > 0)
                    .map(|(track, hits)| {
                        let confidence =
                            (hits as f64 / track.keywords.len() as f64).min(KEYWORD_ONLY_CAP);
                        (track.track_id.clone(), confidence)
                    }),
            };

            match assignment {
                Some((track_id, confidence)) => {
                    rule.track_id = Some(track_id);
                    rule.mapping_confidence = confidence;
                    rule.status = if confidence >= review_threshold {
                        RuleStatus::Mapped
                    } else {
                        RuleStatus::RequiresReview
                    };
                }
                None => {
                    rule.track_id = None;
                    rule.mapping_confidence = 0.0;
                    rule.status = RuleStatus::RequiresReview;
                }
            }
            rule
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionMethod, SourceReference};

    fn unmapped(text: &str, origin: Option<&str>) -> ExtractedRule {
        ExtractedRule {
            rule_id: "d-r001".to_string(),
            text: text.to_string(),
            track_id: None,
            mapping_confidence: 0.0,
            status: RuleStatus::Extracted,
            method: ExtractionMethod::Pattern,
            source: SourceReference {
                document_name: "doc".to_string(),
                document_url: None,
                chunk_index: 0,
                confidence: 0.35,
                query: None,
            },
            provenance_chunks: vec![0],
            origin_track: origin.map(String::from),
        }
    }

    #[test]
    fn test_arabic_baseline_text_maps_to_salaries() {
        let catalog = TrackCatalog::builtin();
        let rules = map_rules(
            vec![unmapped(
                "التحقق من أن مجموع الحسميات لا يتجاوز ثلث الراتب الأساسي",
                Some("salaries"),
            )],
            &catalog,
            0.6,
        );
        assert_eq!(rules[0].track_id.as_deref(), Some("salaries"));
        assert_eq!(rules[0].status, RuleStatus::Mapped);
        assert!(rules[0].mapping_confidence > 0.6);
    }

    #[test]
    fn test_english_text_maps_via_bilingual_keywords() {
        let catalog = TrackCatalog::builtin();
        let rules = map_rules(
            vec![unmapped(
                "the deduction must not exceed one third of base salary",
                Some("salaries"),
            )],
            &catalog,
            0.6,
        );
        assert_eq!(rules[0].status, RuleStatus::Mapped);
        assert!(rules[0].mapping_confidence > 0.6);
    }

    #[test]
    fn test_origin_without_keyword_support_requires_review() {
        let catalog = TrackCatalog::builtin();
        let rules = map_rules(
            vec![unmapped(
                "the committee must convene within thirty days of the request",
                Some("salaries"),
            )],
            &catalog,
            0.6,
        );
        assert_eq!(rules[0].track_id.as_deref(), Some("salaries"));
        assert_eq!(rules[0].status, RuleStatus::RequiresReview);
        assert!(rules[0].mapping_confidence < 0.6);
    }

    #[test]
    fn test_keyword_fallback_without_origin() {
        let catalog = TrackCatalog::builtin();
        let rules = map_rules(
            vec![unmapped(
                "every invoice must match the government tariff for electricity",
                None,
            )],
            &catalog,
            0.6,
        );
        assert_eq!(rules[0].track_id.as_deref(), Some("invoices"));
        assert!(rules[0].mapping_confidence <= KEYWORD_ONLY_CAP);
    }

    #[test]
    fn test_no_signal_at_all_requires_review() {
        let catalog = TrackCatalog::builtin();
        let rules = map_rules(
            vec![unmapped(
                "the committee must convene within thirty days of the request",
                None,
            )],
            &catalog,
            0.6,
        );
        assert!(rules[0].track_id.is_none());
        assert_eq!(rules[0].status, RuleStatus::RequiresReview);
        assert_eq!(rules[0].mapping_confidence, 0.0);
    }

    #[test]
    fn test_unknown_origin_track_falls_back_to_keywords() {
        let catalog = TrackCatalog::builtin();
        let rules = map_rules(
            vec![unmapped(
                "every invoice must match the government tariff for electricity",
                Some("retired-track"),
            )],
            &catalog,
            0.6,
        );
        assert_eq!(rules[0].track_id.as_deref(), Some("invoices"));
    }
}
