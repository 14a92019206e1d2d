//! Multi-query retrieval with merge-by-chunk.
//!
//! Runs every query of one track against the store and merges the results:
//! when the same chunk comes back from several queries, only the highest
//! score survives, along with the query that produced it. The merged set is
//! bounded by `queries × top_k` regardless of document length.

use std::collections::HashMap;

use anyhow::Result;

use crate::models::{IndexHandle, RetrievedChunk};
use crate::store::VectorStore;

/// Retrieve and merge chunks for one track's query set.
///
/// The result is ordered by descending score (chunk index breaking ties) and
/// contains each chunk id at most once.
pub async fn retrieve(
    store: &dyn VectorStore,
    handle: &IndexHandle,
    track_id: &str,
    queries: &[String],
    top_k_per_query: usize,
    min_score: f64,
) -> Result<Vec<RetrievedChunk>> {
    let mut best: HashMap<String, RetrievedChunk> = HashMap::new();

    for query in queries {
        let results = store
            .search(handle, query, track_id, top_k_per_query, min_score)
            .await?;
        for retrieved in results {
            match best.get(&retrieved.chunk.id) {
                Some(existing) if existing.score >= retrieved.score => {}
                _ => {
                    best.insert(retrieved.chunk.id.clone(), retrieved);
                }
            }
        }
    }

    let mut merged: Vec<RetrievedChunk> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.index.cmp(&b.chunk.index))
    });
    Ok(merged)
}
