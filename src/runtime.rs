//! One end-to-end run: read, label, persist, aggregate, report.

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use review_trends::embed::LexicalEmbedder;
use review_trends::ontology::load_seed_topics;
use review_trends::{
    Deduplicator, Embedder, GeminiClient, LabeledReview, OllamaEmbedder, OntologyStore,
    RateLimiter, ReviewLabeler, TopicLabeler, TrendTable, aggregate, parse_reviews_json,
};
use tracing::{debug, info, warn};

use crate::cli::EmbedderKind;
use crate::config_runtime::RunSettings;
use crate::progress::ProgressBarSink;

/// Environment variable holding the Gemini API key.
pub(crate) const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub(crate) async fn run(settings: RunSettings, quiet: bool) -> Result<()> {
    let raw = std::fs::read_to_string(&settings.reviews)
        .with_context(|| format!("Cannot read reviews file '{}'", settings.reviews.display()))?;
    let reviews = parse_reviews_json(&raw)
        .with_context(|| format!("Cannot parse reviews file '{}'", settings.reviews.display()))?;
    info!(reviews = reviews.len(), path = %settings.reviews.display(), "Loaded reviews");

    let mut store = OntologyStore::new(&settings.ontology_path);
    if let Some(seed_path) = &settings.seed_topics {
        store = store.with_seed(load_seed_topics(seed_path)?);
    }
    let mut ontology = store.load();
    info!(topics = ontology.len(), "Ontology ready");

    let labeler = ReviewLabeler::new(build_topic_labeler(&settings)?, build_deduplicator(&settings)?)
        .with_rate_limiter(Arc::new(RateLimiter::new(
            settings.rate_limit_burst,
            settings.rate_limit_pause,
        )))
        .with_fallback_date(settings.fallback_date);

    let show_bar = !quiet && std::io::stderr().is_terminal();
    let progress = ProgressBarSink::new(reviews.len(), show_bar);
    let report = labeler
        .label_all_with_progress(&reviews, &mut ontology, &progress)
        .await;

    store
        .persist(&ontology)
        .context("Failed to save the topic ontology")?;

    if settings.write_labeled {
        write_labeled(&settings, &report.labeled)?;
    }

    let table = aggregate(&report.labeled, settings.target_date, settings.window);
    let report_path = settings.report_path();
    table.write_csv(&report_path)?;
    info!(
        path = %report_path.display(),
        topics = table.topics().len(),
        days = table.dates().len(),
        "Trend report written"
    );

    print_summary(&table, settings.top)?;
    Ok(())
}

fn build_topic_labeler(settings: &RunSettings) -> Result<TopicLabeler> {
    let api_key = std::env::var(GEMINI_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty());

    let labeler = match api_key {
        Some(key) => {
            let client = GeminiClient::with_base_url(
                key,
                &settings.gemini_model,
                &settings.gemini_base_url,
                settings.generation_timeout,
            )?;
            debug!(endpoint = %client.endpoint(), "Using Gemini for topic labels");
            TopicLabeler::new(Box::new(client))
        }
        None => {
            warn!("{GEMINI_API_KEY_ENV} is not set; labeling with keyword rules only");
            TopicLabeler::fallback_only()
        }
    };
    Ok(labeler.with_timeout(settings.generation_timeout))
}

fn build_deduplicator(settings: &RunSettings) -> Result<Deduplicator> {
    let embedder: Box<dyn Embedder> = match settings.embedder {
        EmbedderKind::Ollama => Box::new(OllamaEmbedder::new(
            &settings.ollama_endpoint,
            settings.ollama_model.clone(),
            settings.embed_timeout,
        )?),
        EmbedderKind::Lexical => Box::new(LexicalEmbedder::default()),
        EmbedderKind::Fastembed => local_embedder()?,
    };
    debug!(embedder = embedder.name(), threshold = settings.threshold, "Deduplicator ready");
    Ok(Deduplicator::new(embedder).with_threshold(settings.threshold))
}

#[cfg(feature = "local-embeddings")]
fn local_embedder() -> Result<Box<dyn Embedder>> {
    Ok(Box::new(review_trends::embed::FastEmbedder::new()?))
}

#[cfg(not(feature = "local-embeddings"))]
fn local_embedder() -> Result<Box<dyn Embedder>> {
    anyhow::bail!("the fastembed embedder requires building with `--features local-embeddings`")
}

fn write_labeled(settings: &RunSettings, labeled: &[LabeledReview]) -> Result<()> {
    let path = settings.labeled_path();
    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Cannot create output directory '{}'", settings.output_dir.display())
    })?;
    let mut out = String::new();
    for item in labeled {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    std::fs::write(&path, out)
        .with_context(|| format!("Cannot write labeled reviews '{}'", path.display()))?;
    info!(path = %path.display(), count = labeled.len(), "Labeled reviews written");
    Ok(())
}

fn print_summary(table: &TrendTable, top: usize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if table.is_empty() {
        writeln!(stdout, "No reviews fall within the trend window.")?;
        return Ok(());
    }

    let first = table.dates().first().map(ToString::to_string).unwrap_or_default();
    let last = table.dates().last().map(ToString::to_string).unwrap_or_default();
    writeln!(stdout, "Top topics {first} to {last}:")?;
    for (rank, (topic, total)) in table.top_topics(top).into_iter().enumerate() {
        writeln!(stdout, "{:>3}. {topic} ({total})", rank + 1)?;
    }
    Ok(())
}
