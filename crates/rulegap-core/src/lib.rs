//! Core engine for regulatory rule extraction and gap analysis.
//!
//! The pipeline stages live here as pure, deterministic building blocks:
//! chunking ([`chunk`]), track-scoped query generation ([`queries`]),
//! retrieval over a [`store::VectorStore`] ([`retrieve`]), candidate
//! extraction behind the [`extract::RuleExtractor`] trait, deduplication
//! ([`dedup`]), track mapping ([`mapping`]), and baseline-centric gap
//! analysis ([`gaps`]). Network-backed implementations (embeddings, model
//! extraction) live in the application crate; everything in this crate runs
//! offline and is exercised directly by the unit tests.

pub mod chunk;
pub mod dedup;
pub mod extract;
pub mod gaps;
pub mod mapping;
pub mod models;
pub mod queries;
pub mod retrieve;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod tracks;

pub use chunk::chunk_document;
pub use dedup::deduplicate;
pub use extract::{PatternExtractor, RuleExtractor};
pub use gaps::{analyze_gaps, GapBands};
pub use mapping::map_rules;
pub use models::{
    CandidateRule, Chunk, Document, ExtractedRule, ExtractionMethod, ExtractionResult, Gap,
    GapType, IndexHandle, RetrievedChunk, RuleStatus, Severity, SourceReference,
};
pub use queries::generate_queries;
pub use retrieve::retrieve;
pub use stats::RunStats;
pub use store::{memory::KeywordStore, VectorStore};
pub use tracks::{FinancialTrack, TrackCatalog, TrackRule};
