//! Vision-capable generative model client.
//!
//! The model receives a prompt (optionally with one inline image) and
//! answers in free text. Interpreting that text is the caller's job; see
//! `closet_model::parser` for the parse-or-default boundary.

use async_trait::async_trait;
use closet_model::ImagePayload;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ProviderError, Result};
use crate::http::{ensure_success, trim_base};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const PROVIDER: &str = "gemini";

/// A generative model that turns a prompt (plus optional image) into text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the name of this provider (for logging)
    fn name(&self) -> &str;

    /// Whether a credential is configured.
    ///
    /// Callers that must fail fast on configuration problems check this
    /// before building a request.
    fn has_credentials(&self) -> bool;

    /// Send one prompt and return the reply text.
    async fn generate(&self, prompt: &str, image: Option<&ImagePayload>) -> Result<String>;
}

/// Connection settings for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

/// Client for Google's Gemini `generateContent` API.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            trim_base(&self.config.base_url),
            self.config.model
        )
    }
}

// ---- wire types ----

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn has_credentials(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    async fn generate(&self, prompt: &str, image: Option<&ImagePayload>) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ProviderError::MissingCredential {
                provider: PROVIDER,
                variable: "GEMINI_API_KEY",
            })?;

        let mut parts = vec![Part::Text { text: prompt }];
        if let Some(image) = image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type(),
                    data: image.base64_data(),
                },
            });
        }
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };

        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            with_image = image.is_some(),
            "Sending generateContent request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(PROVIDER, response).await?;
        let data: GenerateResponse = response.json().await?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            error!("Gemini returned no text candidates");
            return Err(ProviderError::invalid(PROVIDER, "no text in first candidate"));
        }
        Ok(text)
    }
}
