//! Embedding-backed vector store with transparent keyword degradation.
//!
//! Chunks are embedded in batches at index time and queries at search time;
//! scores are cosine similarity clamped to `[0, 1]`, the same scale the
//! keyword store reports. When the embedding backend fails, the store flips
//! into degraded mode and serves every subsequent call from the keyword
//! fallback, which indexed the same chunks up front. Callers never see the
//! switch except through a warning log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use rulegap_core::models::{Chunk, Document, IndexHandle, RetrievedChunk};
use rulegap_core::store::{memory::KeywordStore, VectorStore};

use crate::embedding::{cosine_similarity, EmbeddingClient};

pub struct EmbeddingStore {
    embedder: EmbeddingClient,
    fallback: KeywordStore,
    /// Embedded chunks per document id, aligned with the indexed chunk set.
    vectors: RwLock<HashMap<String, Vec<(Chunk, Vec<f32>)>>>,
    degraded: AtomicBool,
}

impl EmbeddingStore {
    pub fn new(embedder: EmbeddingClient) -> Self {
        Self {
            embedder,
            fallback: KeywordStore::new(),
            vectors: RwLock::new(HashMap::new()),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn degrade(&self, stage: &str, err: &anyhow::Error) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(stage, error = %err, "embedding backend failed, degrading to keyword retrieval");
        }
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<(Chunk, Vec<f32>)>> {
        let mut embedded = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embedder.batch_size().max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            embedded.extend(batch.iter().cloned().zip(vectors));
        }
        Ok(embedded)
    }
}

#[async_trait]
impl VectorStore for EmbeddingStore {
    async fn index(&self, document: &Document, chunks: &[Chunk]) -> Result<IndexHandle> {
        // The fallback always indexes, so degradation mid-session can serve
        // documents indexed before the failure.
        let handle = self.fallback.index(document, chunks).await?;

        if !self.is_degraded() {
            match self.embed_chunks(chunks).await {
                Ok(embedded) => {
                    let mut vectors = match self.vectors.write() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    vectors.insert(document.id.clone(), embedded);
                }
                Err(err) => self.degrade("index", &err),
            }
        }
        Ok(handle)
    }

    async fn search(
        &self,
        handle: &IndexHandle,
        query: &str,
        track_id: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<RetrievedChunk>> {
        if !self.is_degraded() {
            let has_vectors = {
                let vectors = match self.vectors.read() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                vectors.contains_key(&handle.document_id)
            };
            if has_vectors {
                match self.embedder.embed_query(query).await {
                    Ok(query_vec) => {
                        return self.search_vectors(handle, &query_vec, query, track_id, top_k, min_score);
                    }
                    Err(err) => self.degrade("search", &err),
                }
            }
        }
        self.fallback
            .search(handle, query, track_id, top_k, min_score)
            .await
    }
}

impl EmbeddingStore {
    fn search_vectors(
        &self,
        handle: &IndexHandle,
        query_vec: &[f32],
        query: &str,
        track_id: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<RetrievedChunk>> {
        let vectors = match self.vectors.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let embedded = match vectors.get(&handle.document_id) {
            Some(e) => e,
            None => return Ok(Vec::new()),
        };

        let mut results: Vec<RetrievedChunk> = embedded
            .iter()
            .filter_map(|(chunk, vec)| {
                // Negative cosine carries no retrieval signal.
                let score = f64::from(cosine_similarity(query_vec, vec)).clamp(0.0, 1.0);
                if score >= min_score {
                    Some(RetrievedChunk {
                        chunk: chunk.clone(),
                        score,
                        query: query.to_string(),
                        track_id: track_id.to_string(),
                    })
                } else {
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk.index.cmp(&b.chunk.index))
        });
        results.truncate(top_k);
        Ok(results)
    }
}
