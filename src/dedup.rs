//! Semantic deduplication of candidate topic labels.
//!
//! A candidate is compared against every ontology entry by cosine similarity
//! of their embeddings. If the best match is strictly above the threshold the
//! existing entry wins; otherwise the candidate is accepted as a new topic.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, instrument};

use crate::embed::{EmbedError, Embedder, cosine_similarity};

/// Similarity above which a candidate collapses onto an existing topic.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Outcome of resolving one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The label to use: an ontology entry or the candidate itself.
    pub label: String,
    /// Best-matching ontology index and its similarity, if the ontology was
    /// non-empty.
    pub best: Option<(usize, f32)>,
    /// True if `label` is an existing ontology entry.
    pub matched: bool,
}

/// Maps candidate labels onto existing ontology entries.
///
/// Ontology entries never change text, so their embeddings are cached by
/// label and only new entries are embedded on later calls.
pub struct Deduplicator {
    embedder: Box<dyn Embedder>,
    threshold: f32,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl Deduplicator {
    /// Creates a deduplicator with [`DEFAULT_SIMILARITY_THRESHOLD`].
    #[must_use]
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Number of cached ontology embeddings.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().map_or(0, |cache| cache.len())
    }

    /// Resolves `candidate` against `ontology`, returning the label to use.
    ///
    /// # Errors
    ///
    /// Returns the embedder's error if embedding fails.
    pub async fn resolve(&self, candidate: &str, ontology: &[String]) -> Result<String, EmbedError> {
        Ok(self.resolve_detailed(candidate, ontology).await?.label)
    }

    /// Like [`resolve`](Self::resolve), also reporting the best match.
    ///
    /// # Errors
    ///
    /// Returns the embedder's error if embedding fails.
    #[instrument(skip(self, ontology), fields(ontology_size = ontology.len(), embedder = self.embedder.name()))]
    pub async fn resolve_detailed(
        &self,
        candidate: &str,
        ontology: &[String],
    ) -> Result<Resolution, EmbedError> {
        if ontology.is_empty() {
            return Ok(Resolution {
                label: candidate.to_string(),
                best: None,
                matched: false,
            });
        }

        let missing = self.uncached(ontology);

        // Candidate first, then any entries not yet cached, in one batch.
        let mut batch = Vec::with_capacity(missing.len() + 1);
        batch.push(candidate.to_string());
        batch.extend(missing.iter().cloned());

        let mut vectors = self.embedder.embed(&batch).await?;
        if vectors.len() != batch.len() {
            return Err(EmbedError::CountMismatch {
                embedder: self.embedder.name().to_string(),
                expected: batch.len(),
                actual: vectors.len(),
            });
        }
        let fresh = vectors.split_off(1);
        let candidate_vector = vectors.remove(0);

        let mut cache = self
            .cache
            .lock()
            .map_err(|_| EmbedError::unavailable(self.embedder.name(), "embedding cache poisoned"))?;
        for (label, vector) in missing.into_iter().zip(fresh) {
            cache.insert(label, vector);
        }

        let mut best: Option<(usize, f32)> = None;
        for (index, label) in ontology.iter().enumerate() {
            let Some(vector) = cache.get(label) else {
                continue;
            };
            let similarity = cosine_similarity(&candidate_vector, vector);
            if !similarity.is_finite() {
                continue;
            }
            // Strict comparison keeps the first index on ties.
            if best.is_none_or(|(_, top)| similarity > top) {
                best = Some((index, similarity));
            }
        }
        drop(cache);

        let resolution = match best {
            Some((index, similarity)) if similarity > self.threshold => Resolution {
                label: ontology[index].clone(),
                best,
                matched: true,
            },
            _ => Resolution {
                label: candidate.to_string(),
                best,
                matched: false,
            },
        };

        debug!(
            candidate,
            resolved = %resolution.label,
            similarity = resolution.best.map(|(_, s)| s),
            matched = resolution.matched,
            "resolved candidate topic"
        );
        Ok(resolution)
    }

    fn uncached(&self, ontology: &[String]) -> Vec<String> {
        let Ok(cache) = self.cache.lock() else {
            return ontology.to_vec();
        };
        let mut seen = std::collections::HashSet::new();
        ontology
            .iter()
            .filter(|label| !cache.contains_key(*label) && seen.insert(label.as_str()))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deduplicator")
            .field("embedder", &self.embedder.name())
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds known labels to fixed vectors, anything else to `[0, 0, 1]`.
    pub(crate) struct TableEmbedder {
        pub table: HashMap<String, Vec<f32>>,
        pub calls: Arc<AtomicUsize>,
        pub embedded: Arc<AtomicUsize>,
    }

    impl TableEmbedder {
        pub(crate) fn new(entries: &[(&str, [f32; 3])]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.to_vec()))
                    .collect(),
                calls: Arc::new(AtomicUsize::new(0)),
                embedded: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        fn name(&self) -> &'static str {
            "table"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
                .collect())
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Err(EmbedError::unavailable("broken", "offline"))
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn name(&self) -> &'static str {
            "short"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(vec![vec![1.0]])
        }
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    // cos([1,0,0], [0.9, 0.43589, 0]) = 0.9
    fn delivery_table() -> TableEmbedder {
        TableEmbedder::new(&[
            ("Delivery issue", [1.0, 0.0, 0.0]),
            ("Food stale", [0.0, 1.0, 0.0]),
            ("Delivery delay again", [0.9, 0.435_89, 0.0]),
        ])
    }

    #[tokio::test]
    async fn test_resolve_similar_candidate_maps_to_existing() {
        let dedup = Deduplicator::new(Box::new(delivery_table()));
        let ontology = labels(&["Delivery issue", "Food stale"]);

        let resolution = dedup
            .resolve_detailed("Delivery delay again", &ontology)
            .await
            .unwrap();
        assert_eq!(resolution.label, "Delivery issue");
        assert!(resolution.matched);
        let (index, similarity) = resolution.best.unwrap();
        assert_eq!(index, 0);
        assert!((similarity - 0.9).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_resolve_skips_non_finite_similarity() {
        let dedup = Deduplicator::new(Box::new(TableEmbedder::new(&[
            ("Garbled", [f32::NAN, 0.0, 0.0]),
            ("Delivery issue", [1.0, 0.0, 0.0]),
            ("Delivery delay again", [0.9, 0.435_89, 0.0]),
        ])));
        let ontology = labels(&["Garbled", "Delivery issue"]);

        let resolution = dedup
            .resolve_detailed("Delivery delay again", &ontology)
            .await
            .unwrap();
        assert_eq!(resolution.label, "Delivery issue");
        assert!(resolution.matched);
        assert_eq!(resolution.best.unwrap().0, 1);
    }

    #[tokio::test]
    async fn test_resolve_empty_ontology_returns_candidate_without_embedding() {
        let embedder = delivery_table();
        let calls = Arc::clone(&embedder.calls);
        let dedup = Deduplicator::new(Box::new(embedder));

        let label = dedup.resolve("App crashes on launch", &[]).await.unwrap();
        assert_eq!(label, "App crashes on launch");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_dissimilar_candidate_is_kept() {
        let dedup = Deduplicator::new(Box::new(delivery_table()));
        let ontology = labels(&["Delivery issue", "Food stale"]);

        let resolution = dedup
            .resolve_detailed("Payment failed", &ontology)
            .await
            .unwrap();
        assert_eq!(resolution.label, "Payment failed");
        assert!(!resolution.matched);
        assert!(resolution.best.is_some());
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_on_members() {
        let dedup = Deduplicator::new(Box::new(delivery_table()));
        let ontology = labels(&["Delivery issue", "Food stale"]);

        for member in &ontology {
            assert_eq!(&dedup.resolve(member, &ontology).await.unwrap(), member);
        }
    }

    #[tokio::test]
    async fn test_resolve_similarity_equal_to_threshold_is_new() {
        let dedup = Deduplicator::new(Box::new(delivery_table())).with_threshold(1.0);
        let ontology = labels(&["Delivery issue"]);

        // Identical vectors give similarity 1.0, not strictly above 1.0.
        let resolution = dedup
            .resolve_detailed("Delivery issue", &ontology)
            .await
            .unwrap();
        assert!(!resolution.matched);
        assert_eq!(resolution.label, "Delivery issue");
    }

    #[tokio::test]
    async fn test_resolve_ties_pick_first_index() {
        let embedder = TableEmbedder::new(&[
            ("Late delivery", [1.0, 0.0, 0.0]),
            ("Delivery late", [1.0, 0.0, 0.0]),
            ("Delivery was late", [1.0, 0.0, 0.0]),
        ]);
        let dedup = Deduplicator::new(Box::new(embedder));
        let ontology = labels(&["Late delivery", "Delivery late"]);

        let resolution = dedup
            .resolve_detailed("Delivery was late", &ontology)
            .await
            .unwrap();
        assert_eq!(resolution.label, "Late delivery");
        assert_eq!(resolution.best.unwrap().0, 0);
    }

    #[tokio::test]
    async fn test_resolve_caches_ontology_embeddings() {
        let embedder = delivery_table();
        let embedded = Arc::clone(&embedder.embedded);
        let dedup = Deduplicator::new(Box::new(embedder));
        let mut ontology = labels(&["Delivery issue", "Food stale"]);

        dedup.resolve("x", &ontology).await.unwrap();
        assert_eq!(embedded.load(Ordering::SeqCst), 3);
        assert_eq!(dedup.cached(), 2);

        dedup.resolve("y", &ontology).await.unwrap();
        assert_eq!(embedded.load(Ordering::SeqCst), 4);

        ontology.push("New topic".to_string());
        dedup.resolve("z", &ontology).await.unwrap();
        assert_eq!(embedded.load(Ordering::SeqCst), 6);
        assert_eq!(dedup.cached(), 3);
    }

    #[tokio::test]
    async fn test_resolve_propagates_embedder_error() {
        let dedup = Deduplicator::new(Box::new(BrokenEmbedder));
        let result = dedup.resolve("x", &labels(&["Delivery issue"])).await;
        assert!(matches!(result, Err(EmbedError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_resolve_rejects_short_batch() {
        let dedup = Deduplicator::new(Box::new(ShortEmbedder));
        let result = dedup.resolve("x", &labels(&["A", "B"])).await;
        assert!(matches!(result, Err(EmbedError::CountMismatch { expected: 3, actual: 1, .. })));
    }

    #[test]
    fn test_deduplicator_default_threshold() {
        let dedup = Deduplicator::new(Box::new(BrokenEmbedder));
        assert!((dedup.threshold() - DEFAULT_SIMILARITY_THRESHOLD).abs() < f32::EPSILON);
        assert_eq!(dedup.embedder_name(), "broken");
    }
}
