//! Cross-query candidate deduplication.
//!
//! Overlapping chunks and track-scoped queries systematically re-extract the
//! same rule: without this pass the pipeline over-counts. Candidates whose
//! normalized text similarity reaches the threshold (or whose normalized
//! text is byte-identical) collapse into one canonical [`ExtractedRule`],
//! keeping the highest-confidence member (ties break toward document order)
//! and recording every contributing chunk index as provenance.

use std::collections::BTreeSet;

use crate::models::{CandidateRule, ExtractedRule, RuleStatus, SourceReference};
use crate::similarity::{normalize_text, similarity};

/// Collapse near-identical candidates into canonical rules for one document.
///
/// The output count never exceeds the input count, and rule ids are stable
/// in document order for the life of the run.
pub fn deduplicate(
    document_id: &str,
    mut candidates: Vec<CandidateRule>,
    threshold: f64,
) -> Vec<ExtractedRule> {
    // Document order first, so tie-breaking and id assignment are stable.
    candidates.sort_by_key(|c| c.chunk.chunk.index);

    let mut clusters: Vec<Vec<CandidateRule>> = Vec::new();
    for candidate in candidates {
        let normalized = normalize_text(&candidate.text);
        let target = clusters.iter().position(|cluster| {
            cluster.iter().any(|member| {
                normalize_text(&member.text) == normalized
                    || similarity(&member.text, &candidate.text) >= threshold
            })
        });
        match target {
            Some(i) => clusters[i].push(candidate),
            None => clusters.push(vec![candidate]),
        }
    }

    let id_prefix: String = document_id.chars().take(8).collect();

    clusters
        .into_iter()
        .enumerate()
        .map(|(seq, cluster)| {
            let provenance: BTreeSet<usize> =
                cluster.iter().map(|c| c.chunk.chunk.index).collect();

            // Highest confidence wins; document order already breaks ties
            // because the comparison is strict.
            let mut kept = &cluster[0];
            for member in &cluster[1..] {
                if member.confidence > kept.confidence {
                    kept = member;
                }
            }

            ExtractedRule {
                rule_id: format!("{}-r{:03}", id_prefix, seq + 1),
                text: kept.text.clone(),
                track_id: None,
                mapping_confidence: 0.0,
                status: RuleStatus::Extracted,
                method: kept.method,
                source: SourceReference {
                    document_name: kept.chunk.chunk.document_name.clone(),
                    document_url: kept.chunk.chunk.source_url.clone(),
                    chunk_index: kept.chunk.chunk.index,
                    confidence: kept.confidence,
                    query: Some(kept.chunk.query.clone()),
                },
                provenance_chunks: provenance.into_iter().collect(),
                origin_track: kept
                    .suggested_track
                    .clone()
                    .or_else(|| Some(kept.chunk.track_id.clone())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ExtractionMethod, RetrievedChunk};

    fn candidate(text: &str, chunk_index: usize, confidence: f64) -> CandidateRule {
        CandidateRule {
            text: text.to_string(),
            chunk: RetrievedChunk {
                chunk: Chunk {
                    id: format!("c{}", chunk_index),
                    document_id: "doc-1".to_string(),
                    index: chunk_index,
                    text: text.to_string(),
                    overlap_len: 0,
                    hash: String::new(),
                    document_name: "circular".to_string(),
                    source_url: None,
                },
                score: 0.5,
                query: "q".to_string(),
                track_id: "salaries".to_string(),
            },
            confidence,
            method: ExtractionMethod::Pattern,
            suggested_track: None,
        }
    }

    #[test]
    fn test_identical_sentences_collapse_to_one() {
        let sentence = "the deduction must not exceed one third of base salary";
        let rules = deduplicate(
            "doc-1",
            vec![candidate(sentence, 0, 0.35), candidate(sentence, 1, 0.35)],
            0.85,
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].provenance_chunks, vec![0, 1]);
        // Tie: the first in document order is kept.
        assert_eq!(rules[0].source.chunk_index, 0);
    }

    #[test]
    fn test_punctuation_variants_collapse() {
        let rules = deduplicate(
            "doc-1",
            vec![
                candidate("Deductions must not exceed one third of base salary.", 0, 0.35),
                candidate("deductions must not exceed one third of base salary", 2, 0.35),
            ],
            0.85,
        );
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_highest_confidence_member_kept() {
        let sentence = "invoices must match the government tariff brackets";
        let rules = deduplicate(
            "doc-1",
            vec![candidate(sentence, 0, 0.35), candidate(sentence, 3, 0.9)],
            0.85,
        );
        assert_eq!(rules.len(), 1);
        assert!((rules[0].source.confidence - 0.9).abs() < 1e-9);
        assert_eq!(rules[0].source.chunk_index, 3);
        assert_eq!(rules[0].provenance_chunks, vec![0, 3]);
    }

    #[test]
    fn test_distinct_rules_stay_separate() {
        let rules = deduplicate(
            "doc-1",
            vec![
                candidate("the deduction must not exceed one third of base salary", 0, 0.35),
                candidate("overtime requires a written assignment letter with full details", 1, 0.35),
            ],
            0.85,
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule_id, "doc-1-r001");
        assert_eq!(rules[1].rule_id, "doc-1-r002");
    }

    #[test]
    fn test_output_never_exceeds_input() {
        let texts = [
            "the deduction must not exceed one third of base salary",
            "the deduction must not exceed one third of the base salary",
            "overtime requires a written assignment letter",
            "invoices must match the tariff",
        ];
        let input: Vec<CandidateRule> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| candidate(t, i, 0.35))
            .collect();
        let n = input.len();
        let rules = deduplicate("doc-1", input, 0.85);
        assert!(rules.len() <= n);
        assert!(rules.len() >= 3, "dissimilar texts must not merge");
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate("doc-1", Vec::new(), 0.85).is_empty());
    }
}
