//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use crate::cli::EmbedderKind;

/// TOML-style file configuration for review-trends defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Persisted ontology location.
    pub ontology_path: Option<PathBuf>,
    /// Plain-text seed topics used when no ontology is persisted.
    pub seed_topics: Option<PathBuf>,
    /// Directory for trend reports.
    pub output_dir: Option<PathBuf>,
    /// Dedup similarity threshold (0..=1).
    pub similarity_threshold: Option<f32>,
    /// Embedding backend.
    pub embedder: Option<EmbedderKind>,
    pub ollama_endpoint: Option<String>,
    pub ollama_model: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    /// Generation calls between pauses.
    pub rate_limit_burst: Option<u32>,
    /// Pause after each burst in milliseconds.
    pub rate_limit_pause_ms: Option<u64>,
    /// Deadline for one generation call.
    pub generation_timeout_secs: Option<u64>,
    /// HTTP timeout for embedding requests.
    pub embed_timeout_secs: Option<u64>,
    /// Date for reviews with unparseable timestamps.
    pub fallback_date: Option<NaiveDate>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.similarity_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            bail!(
                "Invalid config value for `similarity_threshold`: {threshold}. Expected range: 0..=1"
            );
        }

        if let Some(burst) = self.rate_limit_burst
            && !(1..=1000).contains(&burst)
        {
            bail!("Invalid config value for `rate_limit_burst`: {burst}. Expected range: 1..=1000");
        }

        if let Some(pause) = self.rate_limit_pause_ms
            && pause > 60_000
        {
            bail!(
                "Invalid config value for `rate_limit_pause_ms`: {pause}. Expected range: 0..=60000"
            );
        }

        validate_timeout_secs("generation_timeout_secs", self.generation_timeout_secs)?;
        validate_timeout_secs("embed_timeout_secs", self.embed_timeout_secs)?;

        for (field, value) in [
            ("ollama_endpoint", &self.ollama_endpoint),
            ("gemini_base_url", &self.gemini_base_url),
        ] {
            if let Some(value) = value {
                url::Url::parse(value).with_context(|| {
                    format!("Invalid config value for `{field}`: '{value}' is not a URL")
                })?;
            }
        }

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter used when neither `RUST_LOG` nor a CLI flag is given.
    #[must_use]
    pub fn default_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/review-trends/config.toml`
/// 2. `$HOME/.config/review-trends/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("review-trends")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("review-trends")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "ontology_path" => {
                cfg.ontology_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "seed_topics" => {
                cfg.seed_topics = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "similarity_threshold" => {
                cfg.similarity_threshold = Some(parse_float(value).with_context(invalid)?);
            }
            "embedder" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.embedder = Some(EmbedderKind::from_label(&parsed).with_context(|| {
                    format!(
                        "Invalid `embedder` value '{parsed}' on line {line_no}: expected one of ollama, lexical, fastembed"
                    )
                })?);
            }
            "ollama_endpoint" => {
                cfg.ollama_endpoint = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "ollama_model" => {
                cfg.ollama_model = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "gemini_model" => {
                cfg.gemini_model = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "gemini_base_url" => {
                cfg.gemini_base_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "rate_limit_burst" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.rate_limit_burst = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("rate_limit_burst out of range for u32"))?,
                );
            }
            "rate_limit_pause_ms" => {
                cfg.rate_limit_pause_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "generation_timeout_secs" => {
                cfg.generation_timeout_secs =
                    Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "embed_timeout_secs" => {
                cfg.embed_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "fallback_date" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.fallback_date = Some(
                    NaiveDate::parse_from_str(&parsed, "%Y-%m-%d").with_context(|| {
                        format!("Invalid `fallback_date` value '{parsed}' on line {line_no}: expected YYYY-MM-DD")
                    })?,
                );
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_float(raw_value: &str) -> Result<f32> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected numeric value");
    }
    let value = token.parse::<f32>()?;
    if !value.is_finite() {
        bail!("Expected a finite number");
    }
    Ok(value)
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}
