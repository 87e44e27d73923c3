//! Ollama-compatible HTTP embedding service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::http_client::build_service_client;

use super::{EmbedError, Embedder, ensure_count};

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default embedding model served by Ollama.
pub const DEFAULT_OLLAMA_MODEL: &str = "all-minilm";

const NAME: &str = "ollama";

/// Accepted response shapes:
/// - `{ "embeddings": [[...], ...] }`
/// - `{ "data": [ { "embedding": [...] }, ... ] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Embeddings { embeddings: Vec<Vec<f32>> },
    Data { data: Vec<DataItem> },
}

#[derive(Debug, Deserialize)]
struct DataItem {
    embedding: Vec<f32>,
}

impl EmbedResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Embeddings { embeddings } => embeddings,
            Self::Data { data } => data.into_iter().map(|item| item.embedding).collect(),
        }
    }
}

/// Embeds text with an Ollama `/api/embed` endpoint (batched).
pub struct OllamaEmbedder {
    client: Client,
    url: Url,
    model: String,
}

impl OllamaEmbedder {
    /// Creates an embedder for `{endpoint}/api/embed`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Unavailable`] if the endpoint is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(endpoint: &str, model: impl Into<String>, timeout: Duration) -> Result<Self, EmbedError> {
        let url = Url::parse(endpoint)
            .and_then(|base| base.join("api/embed"))
            .map_err(|e| EmbedError::unavailable(NAME, format!("invalid endpoint {endpoint}: {e}")))?;
        let client = build_service_client(NAME, timeout)
            .map_err(|e| EmbedError::unavailable(NAME, e.to_string()))?;

        Ok(Self {
            client,
            url,
            model: model.into(),
        })
    }

    /// The resolved `/api/embed` URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl std::fmt::Debug for OllamaEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEmbedder")
            .field("url", &self.url.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip_all, fields(embedder = NAME, count = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let payload = json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmbedError::network(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedError::Status {
                embedder: NAME.to_string(),
                status: status.as_u16(),
            });
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(NAME, e.to_string()))?;

        let vectors = ensure_count(NAME, texts.len(), body.into_vectors())?;
        debug!(
            dimensions = vectors.first().map_or(0, Vec::len),
            "embedded batch"
        );
        Ok(vectors)
    }
}
