//! Ontology persistence: JSON array of labels on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::TopicOntology;

/// Default location of the persisted ontology.
pub const DEFAULT_ONTOLOGY_PATH: &str = "data/topics.json";

/// Errors raised when saving the ontology.
///
/// Loading never fails; see [`OntologyStore::load`].
#[derive(Debug, Error)]
pub enum OntologyError {
    /// Writing or renaming the snapshot failed.
    #[error("failed to persist ontology to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to serialize ontology: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl OntologyError {
    fn persist(path: &Path, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File-backed ontology store.
#[derive(Debug, Clone)]
pub struct OntologyStore {
    path: PathBuf,
    seed: TopicOntology,
}

impl OntologyStore {
    /// Creates a store at `path` that falls back to the default seed topics.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: TopicOntology::seeded(),
        }
    }

    /// Replaces the ontology returned when nothing usable is persisted.
    #[must_use]
    pub fn with_seed(mut self, seed: TopicOntology) -> Self {
        self.seed = seed;
        self
    }

    /// Path of the persisted snapshot.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted ontology.
    ///
    /// A missing, unreadable or malformed file yields the seed ontology.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> TopicOntology {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no persisted ontology, using seed topics");
                return self.seed.clone();
            }
            Err(e) => {
                warn!(error = %e, "cannot read ontology, using seed topics");
                return self.seed.clone();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(labels) => {
                let ontology = TopicOntology::from_labels(labels);
                debug!(topics = ontology.len(), "loaded persisted ontology");
                ontology
            }
            Err(e) => {
                warn!(error = %e, "ontology file is not a JSON string array, using seed topics");
                self.seed.clone()
            }
        }
    }

    /// Writes the full ontology snapshot.
    ///
    /// The snapshot goes to a temporary file next to the target which is then
    /// renamed over it, so readers never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::Persist`] if the directory, temporary file or
    /// rename fails.
    #[instrument(skip(self, ontology), fields(path = %self.path.display(), topics = ontology.len()))]
    pub fn persist(&self, ontology: &TopicOntology) -> Result<(), OntologyError> {
        let json = serde_json::to_string_pretty(ontology.labels())?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| OntologyError::persist(&parent, e))?;

        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "topics.json".into(), |n| n.to_string_lossy().into_owned());
        let tmp_path = parent.join(format!(".{file_name}.tmp"));

        let mut file =
            std::fs::File::create(&tmp_path).map_err(|e| OntologyError::persist(&tmp_path, e))?;
        let temp = TempFile::new(&tmp_path);
        file.write_all(json.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.sync_all())
            .map_err(|e| OntologyError::persist(&tmp_path, e))?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(|e| OntologyError::persist(&self.path, e))?;
        temp.keep();

        info!("persisted ontology");
        Ok(())
    }
}

/// Removes a temporary file on drop unless [`keep`](Self::keep) is called.
struct TempFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> TempFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(self.path);
        }
    }
}

/// Loads a seed topic list from a plain-text file (one topic per line).
///
/// Blank lines and lines starting with `#` are skipped.
///
/// # Errors
/// Returns error if the file cannot be read.
#[instrument]
pub fn load_seed_topics(path: &Path) -> Result<TopicOntology> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read seed topics file '{}'", path.display()))?;

    let topics = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from);

    Ok(TopicOntology::from_labels(topics))
}
