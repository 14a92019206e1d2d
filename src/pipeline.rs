//! End-to-end document processing.
//!
//! Wires the core stages together behind one entry point: chunk, index,
//! retrieve per track, extract, deduplicate, map, and analyze gaps. Variant
//! selection happens once at construction: the store is embedding-backed or
//! keyword-only, the extractor model-backed or pattern-only, and the stages
//! downstream never branch on which was chosen.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;

use rulegap_core::extract::{PatternExtractor, RuleExtractor};
use rulegap_core::gaps::GapBands;
use rulegap_core::models::{Document, ExtractionResult};
use rulegap_core::stats::RunStats;
use rulegap_core::store::{memory::KeywordStore, VectorStore};
use rulegap_core::tracks::TrackCatalog;
use rulegap_core::{analyze_gaps, chunk_document, deduplicate, generate_queries, map_rules, retrieve};

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::extract_model::ModelExtractor;
use crate::llm::ChatClient;
use crate::store_embedding::EmbeddingStore;

/// One document to process: a name, an optional source URL, and the parsed
/// plain text.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub name: String,
    pub source_url: Option<String>,
    pub text: String,
}

pub struct Pipeline {
    config: Config,
    catalog: TrackCatalog,
    store: Arc<dyn VectorStore>,
    /// Typed view of the store when it is embedding-backed, for the
    /// degradation flag in run statistics.
    embedding_store: Option<Arc<EmbeddingStore>>,
    extractor: Box<dyn RuleExtractor>,
    /// Always-available fallback when the primary extractor fails a chunk.
    fallback_extractor: PatternExtractor,
}

impl Pipeline {
    /// Build a pipeline from configuration, selecting the store and
    /// extractor variants and loading the track catalog.
    pub fn from_config(config: Config) -> Result<Self> {
        let catalog = match &config.catalog {
            Some(path) => {
                let json = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read track catalog: {}", path.display())
                })?;
                TrackCatalog::from_json(&json)?
            }
            None => TrackCatalog::builtin(),
        };
        if catalog.tracks.is_empty() {
            tracing::warn!("track catalog is empty; runs will produce no rules or gaps");
        }

        let mut embedding_store = None;
        let store: Arc<dyn VectorStore> = if config.embedding.is_enabled() {
            let embedding = Arc::new(EmbeddingStore::new(EmbeddingClient::new(
                &config.embedding,
            )?));
            embedding_store = Some(embedding.clone());
            embedding
        } else {
            Arc::new(KeywordStore::new())
        };

        let extractor: Box<dyn RuleExtractor> = if config.llm.is_enabled() {
            let track_ids = catalog.track_ids().iter().map(|s| s.to_string()).collect();
            Box::new(ModelExtractor::new(ChatClient::new(&config.llm)?, track_ids))
        } else {
            Box::new(PatternExtractor::new())
        };

        tracing::info!(
            tracks = catalog.tracks.len(),
            embedding = config.embedding.is_enabled(),
            llm = config.llm.is_enabled(),
            "pipeline ready"
        );

        Ok(Self {
            config,
            catalog,
            store,
            embedding_store,
            extractor,
            fallback_extractor: PatternExtractor::new(),
        })
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    /// Process one document through the full pipeline.
    pub async fn process_document(&self, input: &DocumentInput) -> Result<ExtractionResult> {
        let started = Instant::now();
        let mut stats = RunStats::default();

        let document = Document::new(&input.name, input.source_url.clone(), &input.text);
        let chunks = chunk_document(
            &document,
            self.config.chunking.chunk_size,
            self.config.chunking.overlap,
        )?;
        stats.chunks_indexed = chunks.len();
        tracing::info!(
            document = %document.name,
            language = %document.language,
            chunks = chunks.len(),
            "chunked document"
        );

        let handle = self.store.index(&document, &chunks).await?;
        let queries = generate_queries(&self.catalog);

        let mut candidates = Vec::new();
        let mut extraction_degraded = false;
        for track in &self.catalog.tracks {
            let track_queries = queries
                .get(&track.track_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let merged = retrieve(
                self.store.as_ref(),
                &handle,
                &track.track_id,
                track_queries,
                self.config.retrieval.top_k_per_query,
                self.config.retrieval.min_score,
            )
            .await?;
            stats.chunks_retrieved += merged.len();
            tracing::debug!(track = %track.track_id, retrieved = merged.len(), "retrieval done");

            for chunk in &merged {
                // A model call that fails after retries degrades to pattern
                // extraction for this chunk; the run still completes.
                match self.extractor.extract(chunk).await {
                    Ok(extracted) => candidates.extend(extracted),
                    Err(err) => {
                        tracing::warn!(
                            chunk = %chunk.chunk.id,
                            error = %err,
                            "extraction failed, falling back to pattern matching"
                        );
                        extraction_degraded = true;
                        candidates.extend(self.fallback_extractor.extract(chunk).await?);
                    }
                }
            }
        }
        stats.candidates_extracted = candidates.len();

        let rules = deduplicate(
            &document.id,
            candidates,
            self.config.dedup.similarity_threshold,
        );
        let rules = map_rules(rules, &self.catalog, self.config.mapping.review_threshold);
        let gaps = analyze_gaps(
            &self.catalog.tracks,
            &rules,
            GapBands {
                weak: self.config.gaps.weak_threshold,
                strong: self.config.gaps.strong_threshold,
            },
        );

        stats.record_rules(&rules);
        stats.record_gaps(&gaps);
        stats.retrieval_degraded = self
            .embedding_store
            .as_ref()
            .is_some_and(|s| s.is_degraded());
        stats.extraction_degraded = extraction_degraded;
        let elapsed_seconds = started.elapsed().as_secs_f64();
        tracing::info!(
            document = %document.name,
            rules = rules.len(),
            gaps = gaps.len(),
            elapsed_seconds,
            "processing complete"
        );

        Ok(ExtractionResult {
            document_id: document.id,
            document_name: document.name,
            rules,
            gaps,
            stats,
            elapsed_seconds,
            created_at: Utc::now(),
        })
    }

    /// Process a batch sequentially. One failed document does not abort the
    /// rest; each input yields its own result or error, in input order.
    pub async fn process_documents(
        &self,
        inputs: &[DocumentInput],
    ) -> Vec<(String, Result<ExtractionResult>)> {
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let outcome = self.process_document(input).await;
            if let Err(err) = &outcome {
                tracing::error!(document = %input.name, error = %err, "document failed");
            }
            results.push((input.name.clone(), outcome));
        }
        results
    }
}
