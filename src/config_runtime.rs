//! Merges CLI arguments over file configuration into run settings.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use review_trends::embed::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL};
use review_trends::http_client::DEFAULT_REQUEST_TIMEOUT_SECS;
use review_trends::label::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GENERATION_TIMEOUT};
use review_trends::labeler::default_fallback_date;
use review_trends::ontology::DEFAULT_ONTOLOGY_PATH;
use review_trends::rate_limiter::{DEFAULT_BURST, DEFAULT_PAUSE};
use review_trends::DEFAULT_SIMILARITY_THRESHOLD;

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::{Args, EmbedderKind};

/// Default directory for trend reports.
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "output";

/// Everything a run needs, after CLI > config file > built-in defaults.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) reviews: PathBuf,
    pub(crate) target_date: NaiveDate,
    pub(crate) window: u32,
    pub(crate) top: usize,
    pub(crate) ontology_path: PathBuf,
    pub(crate) seed_topics: Option<PathBuf>,
    pub(crate) output_dir: PathBuf,
    pub(crate) threshold: f32,
    pub(crate) embedder: EmbedderKind,
    pub(crate) ollama_endpoint: String,
    pub(crate) ollama_model: String,
    pub(crate) gemini_model: String,
    pub(crate) gemini_base_url: String,
    pub(crate) rate_limit_burst: u32,
    pub(crate) rate_limit_pause: Duration,
    pub(crate) generation_timeout: Duration,
    pub(crate) embed_timeout: Duration,
    pub(crate) fallback_date: NaiveDate,
    pub(crate) write_labeled: bool,
}

impl RunSettings {
    pub(crate) fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();

        Self {
            reviews: args.reviews.clone(),
            target_date: args.target_date,
            window: args.window,
            top: args.top,
            ontology_path: args
                .ontology
                .clone()
                .or(file.ontology_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ONTOLOGY_PATH)),
            seed_topics: args.seed_topics.clone().or(file.seed_topics),
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            threshold: args
                .threshold
                .or(file.similarity_threshold)
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
            embedder: args.embedder.or(file.embedder).unwrap_or(EmbedderKind::Ollama),
            ollama_endpoint: file
                .ollama_endpoint
                .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
            ollama_model: file
                .ollama_model
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            gemini_model: file
                .gemini_model
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: file
                .gemini_base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            rate_limit_burst: args
                .rate_limit_burst
                .or(file.rate_limit_burst)
                .unwrap_or(DEFAULT_BURST),
            rate_limit_pause: args
                .rate_limit_pause_ms
                .or(file.rate_limit_pause_ms)
                .map_or(DEFAULT_PAUSE, Duration::from_millis),
            generation_timeout: args
                .generation_timeout_secs
                .or(file.generation_timeout_secs)
                .map_or(DEFAULT_GENERATION_TIMEOUT, Duration::from_secs),
            embed_timeout: Duration::from_secs(
                file.embed_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            fallback_date: args
                .fallback_date
                .or(file.fallback_date)
                .unwrap_or_else(default_fallback_date),
            write_labeled: args.write_labeled,
        }
    }

    /// `trend_report_<target>.csv` inside the output directory.
    pub(crate) fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("trend_report_{}.csv", self.target_date.format("%Y-%m-%d")))
    }

    /// `labeled_reviews_<target>.jsonl` inside the output directory.
    pub(crate) fn labeled_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("labeled_reviews_{}.jsonl", self.target_date.format("%Y-%m-%d")))
    }
}

/// Default log filter. Priority: quiet flag > verbose flag > config > info.
/// `RUST_LOG`, when set, overrides all of these.
pub(crate) fn default_log_level(args: &Args, file: Option<&FileConfig>) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file
            .and_then(|cfg| cfg.verbosity)
            .map_or("info", VerbositySetting::default_level),
        1 => "debug",
        _ => "trace",
    }
}
