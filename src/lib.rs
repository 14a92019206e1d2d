//! Application layer over `rulegap-core`: configuration, network-backed
//! embedding and model extraction, the variant-selecting pipeline, and the
//! CLI entry points.

pub mod config;
pub mod embedding;
pub mod extract_model;
pub mod llm;
pub mod pipeline;
pub mod store_embedding;

pub use config::{load_config, Config};
pub use pipeline::{DocumentInput, Pipeline};
