//! Gemini `generateContent` client for topic labels.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::http_client::{DEFAULT_REQUEST_TIMEOUT_SECS, build_service_client};

use super::prompt::{clean_label, topic_prompt};
use super::{LabelError, LabelGenerator};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model for label generation.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const SERVICE: &str = "gemini";

// ==================== Gemini API Types ====================

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        Some(text)
    }
}

// ==================== GeminiClient ====================

/// Generates topic labels with the Gemini REST API.
///
/// The API key is sent in the `x-goog-api-key` header so it never shows up
/// in logged URLs.
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiClient {
    /// Creates a client against the public Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError`] if the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>, model: &str) -> Result<Self, LabelError> {
        Self::with_base_url(
            api_key,
            model,
            DEFAULT_GEMINI_BASE_URL,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LabelError`] if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: &str,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self, LabelError> {
        let endpoint = endpoint_url(base_url, model).map_err(|e| LabelError::InvalidEndpoint {
            service: SERVICE.to_string(),
            reason: format!("{base_url}: {e}"),
        })?;
        let client = build_service_client(SERVICE, request_timeout).map_err(|source| {
            LabelError::ClientBuild {
                service: SERVICE.to_string(),
                source,
            }
        })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    /// The fully-resolved `generateContent` URL.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LabelGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    #[tracing::instrument(skip_all, fields(service = SERVICE))]
    async fn generate(&self, review_text: &str) -> Result<String, LabelError> {
        let prompt = topic_prompt(review_text);
        let request = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
        };

        debug!(endpoint = %self.endpoint, "calling Gemini generateContent");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LabelError::network(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabelError::status(SERVICE, status.as_u16(), &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LabelError::malformed(SERVICE, e.to_string()))?;

        let raw = body
            .first_text()
            .ok_or_else(|| LabelError::malformed(SERVICE, "response has no candidate text"))?;

        let label = clean_label(&raw);
        if label.is_empty() {
            return Err(LabelError::empty(SERVICE));
        }

        debug!(label = %label, "Gemini produced label");
        Ok(label)
    }
}

/// Builds `{base}/v1beta/models/{model}:generateContent`.
fn endpoint_url(base_url: &str, model: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("v1beta/models/{model}:generateContent"))
}
