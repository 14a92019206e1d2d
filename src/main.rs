//! # RuleGap CLI (`rulegap`)
//!
//! Command-line interface for the rule extraction and gap analysis engine.
//!
//! ## Usage
//!
//! ```bash
//! rulegap --config ./rulegap.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rulegap process <file>` | Run the full pipeline over one document |
//! | `rulegap tracks` | List the track catalog and its baseline rules |
//! | `rulegap queries` | Print the retrieval queries generated per track |
//!
//! ## Examples
//!
//! ```bash
//! # Process a circular with the built-in catalog and offline extraction
//! rulegap process ./circular.txt --name "Circular 42"
//!
//! # Write the full result as JSON
//! rulegap process ./circular.txt --json ./result.json
//!
//! # Inspect the catalog driving retrieval and gap analysis
//! rulegap tracks
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rulegap::config::{self, Config};
use rulegap::pipeline::{DocumentInput, Pipeline};
use rulegap_core::generate_queries;
use rulegap_core::models::ExtractionResult;

/// RuleGap — retrieval-augmented extraction of regulatory rules from
/// financial documents, with track mapping and baseline gap analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; without one, built-in defaults are used (keyword retrieval and
/// pattern extraction, no network calls).
#[derive(Parser)]
#[command(
    name = "rulegap",
    about = "Extract regulatory rules from financial documents and analyze gaps against track baselines",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when
    /// omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Process a document through the full pipeline.
    ///
    /// Reads the file as plain text, chunks and indexes it, retrieves per
    /// track, extracts and deduplicates rules, maps them to tracks, and
    /// reports gaps against each track's baseline.
    Process {
        /// Path to the plain-text document.
        file: PathBuf,

        /// Display name for the document. Defaults to the file name.
        #[arg(long)]
        name: Option<String>,

        /// Source URL recorded in rule provenance.
        #[arg(long)]
        url: Option<String>,

        /// Write the full extraction result as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// List the track catalog: names, keywords, and baseline rules.
    Tracks,

    /// Print the retrieval queries generated for each track.
    Queries,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Process {
            file,
            name,
            url,
            json,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read document: {}", file.display()))?;
            let name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string())
            });

            let pipeline = Pipeline::from_config(cfg)?;
            let result = pipeline
                .process_document(&DocumentInput {
                    name,
                    source_url: url,
                    text,
                })
                .await?;

            print_summary(&result);

            if let Some(path) = json {
                let payload = serde_json::to_string_pretty(&result)?;
                std::fs::write(&path, payload)
                    .with_context(|| format!("Failed to write result: {}", path.display()))?;
                println!("\nFull result written to {}", path.display());
            }
        }
        Commands::Tracks => {
            let pipeline = Pipeline::from_config(cfg)?;
            for track in &pipeline.catalog().tracks {
                println!("{} — {} / {}", track.track_id, track.name_en, track.name_ar);
                println!("  keywords: {}", track.keywords.join(", "));
                println!("  baseline rules:");
                for rule in &track.current_rules {
                    println!("    {}  {}", rule.rule_id, rule.description);
                }
                println!();
            }
        }
        Commands::Queries => {
            let pipeline = Pipeline::from_config(cfg)?;
            for (track_id, queries) in generate_queries(pipeline.catalog()) {
                println!("{}:", track_id);
                for query in queries {
                    println!("  {}", query);
                }
                println!();
            }
        }
    }

    Ok(())
}

fn print_summary(result: &ExtractionResult) {
    println!(
        "Processed '{}' in {:.2}s",
        result.document_name, result.elapsed_seconds
    );
    println!(
        "  chunks: {} indexed, {} retrieved",
        result.stats.chunks_indexed, result.stats.chunks_retrieved
    );
    println!(
        "  rules: {} ({} mapped, {} require review)",
        result.rules.len(),
        result.stats.rules_mapped,
        result.stats.rules_requiring_review
    );
    println!(
        "  gaps: {} ({} missing, {} partial, {} conflicting)",
        result.gaps.len(),
        result.stats.gaps_missing,
        result.stats.gaps_partial,
        result.stats.gaps_conflicting
    );

    if !result.rules.is_empty() {
        println!("\nExtracted rules:");
        for rule in &result.rules {
            let track = rule.track_id.as_deref().unwrap_or("-");
            println!(
                "  [{}] ({}, {:.2}) {}",
                rule.rule_id, track, rule.mapping_confidence, rule.text
            );
        }
    }

    if !result.gaps.is_empty() {
        println!("\nGaps:");
        for gap in &result.gaps {
            println!(
                "  [{}] {} {} — {}",
                gap.baseline_rule_id,
                gap.severity.as_str(),
                match gap.gap_type {
                    rulegap_core::models::GapType::Missing => "missing",
                    rulegap_core::models::GapType::Partial => "partial",
                    rulegap_core::models::GapType::Conflicting => "conflicting",
                },
                gap.recommendation
            );
        }
    }
}
