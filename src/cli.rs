//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use review_trends::DEFAULT_WINDOW_DAYS;

/// Label product reviews with topics and report daily topic trends.
///
/// Each review gets a short topic label from a text-generation service
/// (keyword rules when `GEMINI_API_KEY` is unset), near-duplicate labels are
/// merged into a persisted topic ontology, and per-day counts for the
/// trailing window are written as CSV.
#[derive(Parser, Debug)]
#[command(name = "review-trends")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Reviews file: JSON array or JSON Lines (CSV is not accepted; convert first)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub reviews: PathBuf,

    /// Last day of the trend window (YYYY-MM-DD)
    #[arg(short = 't', long, value_name = "DATE", value_parser = parse_date)]
    pub target_date: NaiveDate,

    /// Trend window length in days, including the target date (1-366)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WINDOW_DAYS, value_parser = clap::value_parser!(u32).range(1..=366))]
    pub window: u32,

    /// Persisted topic ontology (JSON array of labels)
    #[arg(long, value_name = "FILE")]
    pub ontology: Option<PathBuf>,

    /// Seed topics used when no ontology is persisted (one per line)
    #[arg(long, value_name = "FILE")]
    pub seed_topics: Option<PathBuf>,

    /// Directory for the trend report
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of topics in the printed summary
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Similarity above which a new label merges into an existing topic (0-1)
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f32>,

    /// Embedding backend used for deduplication
    #[arg(long, value_enum)]
    pub embedder: Option<EmbedderKind>,

    /// Generation calls allowed between pauses (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub rate_limit_burst: Option<u32>,

    /// Pause after each burst in milliseconds (0 to disable, max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit_pause_ms: Option<u64>,

    /// Deadline for a single generation call in seconds (1-600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub generation_timeout_secs: Option<u64>,

    /// Date assigned to reviews with unparseable timestamps (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub fallback_date: Option<NaiveDate>,

    /// Also write labeled reviews as JSON Lines next to the report
    #[arg(long)]
    pub write_labeled: bool,
}

/// Embedding backends selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Ollama-compatible `/api/embed` service
    Ollama,
    /// Offline hashed word/trigram features
    Lexical,
    /// In-process sentence model (requires the `local-embeddings` feature)
    Fastembed,
}

impl EmbedderKind {
    /// Parses a config-file label.
    pub fn from_label(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{value}': {e}"))
}

fn parse_threshold(value: &str) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|e| format!("expected a number, got '{value}': {e}"))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("threshold must be within 0..=1, got {parsed}"))
    }
}
