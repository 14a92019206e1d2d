//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the single retrieval contract both variants
//! implement: the embedding-backed store in the application crate and the
//! in-memory keyword store here. Both score on the same `[0, 1]` scale so
//! downstream confidence blending does not care which produced a result.
//!
//! Implementations must be `Send + Sync`; concurrent `search` calls are
//! always safe, and concurrent `index` calls for the same document id are
//! serialized internally so "reindex replaces" is never observable as a
//! partially applied state.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, Document, IndexHandle, RetrievedChunk};

/// Retrieval backend for chunked documents.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Index a document's chunks, returning a handle for retrieval.
    ///
    /// Idempotent per document: indexing the same document id again replaces
    /// its prior chunk set rather than duplicating it. The returned handle is
    /// only produced once the index is fully populated.
    async fn index(&self, document: &Document, chunks: &[Chunk]) -> Result<IndexHandle>;

    /// Search the indexed chunks of one document.
    ///
    /// Returns at most `top_k` chunks ordered by descending score, every
    /// score in `[0, 1]` and at least `min_score`. The `query` and `track_id`
    /// are recorded on each result for traceability.
    async fn search(
        &self,
        handle: &IndexHandle,
        query: &str,
        track_id: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<RetrievedChunk>>;
}
