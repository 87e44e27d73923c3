//! The topic ontology: canonical topic labels in discovery order.
//!
//! A [`TopicOntology`] is an append-only arena of labels. Labels are plain
//! values; exact duplicates are rejected on append, semantic near-duplicates
//! are collapsed earlier by the deduplicator. [`OntologyStore`] loads the
//! ontology at run start and persists the end-of-run snapshot.

mod store;

pub use store::{DEFAULT_ONTOLOGY_PATH, OntologyError, OntologyStore, load_seed_topics};

use std::collections::HashSet;

use tracing::debug;

/// Default seed topics used when no persisted ontology is available.
pub const SEED_TOPICS: [&str; 10] = [
    "Delivery issue",
    "Food stale",
    "Delivery partner rude",
    "Maps not working properly",
    "Instamart should be open all night",
    "Bring back 10 minute bolt delivery",
    "App crashes",
    "Payment failed",
    "Refund not received",
    "Customer support unhelpful",
];

/// Ordered, exact-unique collection of canonical topic labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicOntology {
    labels: Vec<String>,
    index: HashSet<String>,
}

impl TopicOntology {
    /// Creates an empty ontology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an ontology seeded with [`SEED_TOPICS`].
    #[must_use]
    pub fn seeded() -> Self {
        Self::from_labels(SEED_TOPICS.iter().map(|s| (*s).to_string()))
    }

    /// Builds an ontology from labels, keeping the first of any exact duplicates.
    #[must_use]
    pub fn from_labels(labels: impl IntoIterator<Item = String>) -> Self {
        let mut ontology = Self::new();
        for label in labels {
            ontology.append(label);
        }
        ontology
    }

    /// Returns true if `label` is present under exact text equality.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains(label)
    }

    /// Appends `label` if absent. Returns true if the ontology grew.
    pub fn append(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.index.contains(&label) {
            return false;
        }
        debug!(topic = %label, size = self.labels.len(), "appending topic to ontology");
        self.index.insert(label.clone());
        self.labels.push(label);
        true
    }

    /// Labels in discovery order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the ontology has no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
