//! Per-review orchestration: generate, deduplicate, grow the ontology.
//!
//! Reviews are processed strictly in input order. A topic discovered while
//! labeling review *i* is appended to the ontology before review *i + 1* is
//! resolved, so later reviews can collapse onto it.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::dedup::Deduplicator;
use crate::label::TopicLabeler;
use crate::ontology::TopicOntology;
use crate::rate_limiter::RateLimiter;
use crate::review::{Review, parse_review_date};

/// Topic assigned when a review cannot be resolved.
pub const UNKNOWN_ISSUE: &str = "Unknown issue";

/// Progress is logged every this many reviews.
pub const DEFAULT_PROGRESS_EVERY: usize = 5;

/// Rate-limiter key used when no generation service is configured.
const FALLBACK_RATE_KEY: &str = "keyword-fallback";

/// Date used for reviews whose timestamp cannot be parsed.
#[must_use]
pub fn default_fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or(NaiveDate::MIN)
}

/// One review with its canonical topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledReview {
    pub date: NaiveDate,
    pub review: String,
    pub topic: String,
}

/// Outcome of labeling a batch.
#[derive(Debug, Clone, Default)]
pub struct LabelingReport {
    /// One entry per input review, in input order.
    pub labeled: Vec<LabeledReview>,
    /// Topics appended to the ontology during the run, in discovery order.
    pub new_topics: Vec<String>,
    /// Reviews that received [`UNKNOWN_ISSUE`].
    pub failures: usize,
}

/// Receives per-review progress notifications.
pub trait ProgressSink: Send + Sync {
    /// Called after each review with the 1-based count processed so far.
    fn on_review(&self, processed: usize, total: usize, topic: &str);

    /// Called once after the last review.
    fn on_finish(&self, _report: &LabelingReport) {}
}

/// A sink that ignores all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_review(&self, _processed: usize, _total: usize, _topic: &str) {}
}

/// Labels reviews against a growing ontology.
#[derive(Debug)]
pub struct ReviewLabeler {
    topic_labeler: TopicLabeler,
    deduplicator: Deduplicator,
    rate_limiter: Arc<RateLimiter>,
    fallback_date: NaiveDate,
    progress_every: usize,
}

impl ReviewLabeler {
    /// Creates a labeler with default pacing and fallback date.
    #[must_use]
    pub fn new(topic_labeler: TopicLabeler, deduplicator: Deduplicator) -> Self {
        Self {
            topic_labeler,
            deduplicator,
            rate_limiter: Arc::new(RateLimiter::default()),
            fallback_date: default_fallback_date(),
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[must_use]
    pub fn with_fallback_date(mut self, date: NaiveDate) -> Self {
        self.fallback_date = date;
        self
    }

    /// Sets the progress log interval (minimum 1).
    #[must_use]
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    #[must_use]
    pub fn fallback_date(&self) -> NaiveDate {
        self.fallback_date
    }

    /// Labels a single review, appending its topic to `ontology` if new.
    ///
    /// Never fails: an embedding failure yields [`UNKNOWN_ISSUE`], which is
    /// not added to the ontology.
    #[instrument(skip_all, fields(review_id = %review.id))]
    pub async fn label_one(&self, review: &Review, ontology: &mut TopicOntology) -> LabeledReview {
        self.label_review(review, ontology).await.0
    }

    /// Labels every review in order.
    #[instrument(skip_all, fields(total = reviews.len()))]
    pub async fn label_all(&self, reviews: &[Review], ontology: &mut TopicOntology) -> LabelingReport {
        self.label_all_with_progress(reviews, ontology, &NoProgress)
            .await
    }

    /// Labels every review in order, notifying `progress` after each one.
    #[instrument(skip_all, fields(total = reviews.len()))]
    pub async fn label_all_with_progress(
        &self,
        reviews: &[Review],
        ontology: &mut TopicOntology,
        progress: &dyn ProgressSink,
    ) -> LabelingReport {
        let total = reviews.len();
        let mut report = LabelingReport {
            labeled: Vec::with_capacity(total),
            ..LabelingReport::default()
        };

        for (index, review) in reviews.iter().enumerate() {
            let (labeled, outcome) = self.label_review(review, ontology).await;
            match outcome {
                Outcome::New => report.new_topics.push(labeled.topic.clone()),
                Outcome::Failed => report.failures += 1,
                Outcome::Existing => {}
            }

            let processed = index + 1;
            progress.on_review(processed, total, &labeled.topic);
            if processed % self.progress_every == 0 {
                info!(processed, total, "labeling progress");
            }
            report.labeled.push(labeled);
        }

        info!(
            total,
            new_topics = report.new_topics.len(),
            failures = report.failures,
            ontology_size = ontology.len(),
            "labeling complete"
        );
        progress.on_finish(&report);
        report
    }

    async fn label_review(
        &self,
        review: &Review,
        ontology: &mut TopicOntology,
    ) -> (LabeledReview, Outcome) {
        let date = self.review_date(review);

        let key = self.topic_labeler.service_name().unwrap_or(FALLBACK_RATE_KEY);
        self.rate_limiter.acquire(key).await;

        let candidate = self.topic_labeler.generate(&review.text).await;

        let resolved = self
            .deduplicator
            .resolve(&candidate.label, ontology.labels())
            .await;
        let (topic, outcome) = match resolved {
            Ok(topic) => {
                if ontology.append(topic.clone()) {
                    info!(topic = %topic, "new topic discovered");
                    (topic, Outcome::New)
                } else {
                    (topic, Outcome::Existing)
                }
            }
            Err(error) => {
                warn!(
                    review_id = %review.id,
                    candidate = %candidate.label,
                    error = %error,
                    "topic resolution failed; using sentinel topic"
                );
                (UNKNOWN_ISSUE.to_string(), Outcome::Failed)
            }
        };

        (
            LabeledReview {
                date,
                review: review.text.clone(),
                topic,
            },
            outcome,
        )
    }

    fn review_date(&self, review: &Review) -> NaiveDate {
        parse_review_date(&review.timestamp).unwrap_or_else(|| {
            warn!(
                review_id = %review.id,
                timestamp = %review.timestamp,
                fallback = %self.fallback_date,
                "unparseable review timestamp; using fallback date"
            );
            self.fallback_date
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    New,
    Existing,
    Failed,
}
