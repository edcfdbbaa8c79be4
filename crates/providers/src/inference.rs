//! Background-removal inference provider.
//!
//! The provider only exposes a pull interface: submit a job, get back a
//! status URL, then ask that URL until the job reaches a terminal state.
//! Polling policy lives in the pipeline crate; this module only knows the
//! three HTTP calls.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::http::{ensure_success, trim_base};

pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com";
/// lucataco/remove-bg
pub const DEFAULT_REMOVE_BG_VERSION: &str =
    "95fcc2a26d3899cd6c2691c900465aaeff466285a65c14638cc5f36f34befaf1";

const PROVIDER: &str = "replicate";

/// A submitted inference job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceJob {
    pub id: String,
    /// URL to GET for the job's current status
    pub status_url: String,
}

/// Lifecycle state reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Terminal states end polling; everything else means "ask again".
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Canceled)
    }
}

/// One status observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    /// Output URLs; the provider reports either one URL or an array
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn first_output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }
}

/// Submit/poll/download contract of an asynchronous image-inference service.
#[async_trait]
pub trait BackgroundRemovalProvider: Send + Sync {
    /// Submit a job for the image at `image_url`.
    async fn submit(&self, image_url: &str) -> Result<InferenceJob>;

    /// Fetch the job's current status.
    async fn status(&self, job: &InferenceJob) -> Result<JobStatus>;

    /// Download a produced artifact.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Connection settings for the Replicate predictions API
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    pub model_version: String,
}

impl ReplicateConfig {
    pub fn new(api_token: Option<String>) -> Self {
        Self {
            api_token,
            base_url: DEFAULT_REPLICATE_BASE_URL.to_string(),
            model_version: DEFAULT_REMOVE_BG_VERSION.to_string(),
        }
    }
}

/// Client for Replicate's predictions API.
pub struct ReplicateClient {
    http: reqwest::Client,
    config: ReplicateConfig,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: JobState,
    #[serde(default)]
    urls: Option<PredictionUrls>,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl ReplicateClient {
    pub fn new(http: reqwest::Client, config: ReplicateConfig) -> Self {
        Self { http, config }
    }

    fn token(&self) -> Result<&str> {
        self.config
            .api_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ProviderError::MissingCredential {
                provider: PROVIDER,
                variable: "REPLICATE_API_TOKEN",
            })
    }
}

/// `output` is a URL string, an array of URL strings, or null.
fn output_urls(output: &Value) -> Vec<String> {
    match output {
        Value::String(url) => vec![url.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn error_text(error: Option<Value>) -> Option<String> {
    match error? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl BackgroundRemovalProvider for ReplicateClient {
    async fn submit(&self, image_url: &str) -> Result<InferenceJob> {
        let token = self.token()?;
        let body = json!({
            "version": self.config.model_version,
            "input": { "image": image_url },
        });

        let response = self
            .http
            .post(format!("{}/v1/predictions", trim_base(&self.config.base_url)))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let prediction: Prediction = ensure_success(PROVIDER, response).await?.json().await?;

        let status_url = prediction
            .urls
            .and_then(|urls| urls.get)
            .ok_or_else(|| ProviderError::invalid(PROVIDER, "prediction has no status URL"))?;

        debug!(job_id = %prediction.id, state = ?prediction.status, "Submitted inference job");
        Ok(InferenceJob {
            id: prediction.id,
            status_url,
        })
    }

    async fn status(&self, job: &InferenceJob) -> Result<JobStatus> {
        let token = self.token()?;
        let response = self
            .http
            .get(&job.status_url)
            .bearer_auth(token)
            .send()
            .await?;
        let prediction: Prediction = ensure_success(PROVIDER, response).await?.json().await?;

        Ok(JobStatus {
            state: prediction.status,
            outputs: output_urls(&prediction.output),
            error: error_text(prediction.error),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        let bytes = ensure_success(PROVIDER, response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
