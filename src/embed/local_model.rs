//! Local sentence-embedding model via `fastembed`.

use std::sync::Mutex;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, instrument};

use super::{EmbedError, Embedder, ensure_count};

const NAME: &str = "fastembed";

/// all-MiniLM-L6-v2; the similarity threshold default is tuned for it.
pub const LOCAL_MODEL: EmbeddingModel = EmbeddingModel::AllMiniLML6V2;

/// Output width of [`LOCAL_MODEL`].
pub const LOCAL_MODEL_DIMENSIONS: usize = 384;

/// Runs [`LOCAL_MODEL`] in-process.
///
/// The model is downloaded on first use and cached by fastembed.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Loads [`LOCAL_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Unavailable`] if the model cannot be loaded.
    #[instrument]
    pub fn new() -> Result<Self, EmbedError> {
        let model = TextEmbedding::try_new(init_options())
            .map_err(|e| EmbedError::unavailable(NAME, e.to_string()))?;
        debug!("loaded local embedding model");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

fn init_options() -> InitOptions {
    InitOptions::new(LOCAL_MODEL)
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder").finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbedError::unavailable(NAME, "model lock poisoned"))?;
        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbedError::unavailable(NAME, e.to_string()))?;
        ensure_count(NAME, texts.len(), vectors)
    }
}
