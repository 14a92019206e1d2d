//! Track-scoped query generation.
//!
//! Retrieval precision depends on query specificity: each track contributes
//! one query per subtopic and per working language instead of a single broad
//! question, so no subtopic starves the others of top-k slots. Generation is
//! deterministic and does no I/O.

use std::collections::BTreeMap;

use crate::tracks::TrackCatalog;

/// Generate the ordered query set for every track in the catalog.
///
/// Each subtopic yields an Arabic and an English phrasing, in catalog order.
/// The per-track query count bounds total retrieval volume: extraction cost
/// becomes a function of the catalog, not of document length.
pub fn generate_queries(catalog: &TrackCatalog) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for track in &catalog.tracks {
        let mut queries = Vec::with_capacity(track.subtopics.len() * 2);
        for subtopic in &track.subtopics {
            queries.push(format!("ما هي القواعد والشروط المتعلقة بـ{}؟", subtopic.ar));
            queries.push(format!(
                "What are the rules and conditions regarding {}?",
                subtopic.en
            ));
        }
        out.insert(track.track_id.clone(), queries);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_track_gets_queries() {
        let catalog = TrackCatalog::builtin();
        let queries = generate_queries(&catalog);
        assert_eq!(queries.len(), catalog.tracks.len());
        for track in &catalog.tracks {
            let q = &queries[&track.track_id];
            assert_eq!(q.len(), track.subtopics.len() * 2);
        }
    }

    #[test]
    fn test_deterministic() {
        let catalog = TrackCatalog::builtin();
        assert_eq!(generate_queries(&catalog), generate_queries(&catalog));
    }

    #[test]
    fn test_queries_are_bilingual() {
        let catalog = TrackCatalog::builtin();
        let queries = generate_queries(&catalog);
        let salaries = &queries["salaries"];
        assert!(salaries.iter().any(|q| q.contains("الحسميات")));
        assert!(salaries.iter().any(|q| q.contains("deductions")));
    }
}
