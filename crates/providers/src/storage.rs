//! Durable object storage for uploaded images.
//!
//! The inference provider needs a URL it can fetch, so input images are
//! written to a public-read bucket first.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::http::{ensure_success, trim_base};

const PROVIDER: &str = "object-storage";

/// Write-only object storage returning public URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str, public: bool)
        -> Result<String>;
}

/// Bucket endpoints and credentials
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Base URL objects are PUT to (`{upload_url}/{key}`)
    pub upload_url: Option<String>,
    /// Base URL objects are served from; defaults to `upload_url`
    pub public_url: Option<String>,
    pub token: Option<String>,
}

/// S3-style bucket accessed with plain `PUT` requests.
pub struct HttpObjectStore {
    http: reqwest::Client,
    config: StorageConfig,
}

impl HttpObjectStore {
    pub fn new(http: reqwest::Client, config: StorageConfig) -> Self {
        Self { http, config }
    }

    fn upload_base(&self) -> Result<String> {
        self.config
            .upload_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(trim_base)
            .ok_or(ProviderError::MissingCredential {
                provider: PROVIDER,
                variable: "STORAGE_UPLOAD_URL",
            })
    }

    /// Public URL for `key`.
    pub fn public_url(&self, key: &str) -> Result<String> {
        let base = match self.config.public_url.as_deref() {
            Some(url) if !url.trim().is_empty() => trim_base(url),
            _ => self.upload_base()?,
        };
        Ok(format!("{base}/{}", key.trim_start_matches('/')))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<String> {
        let key = key.trim_start_matches('/');
        let size = bytes.len();
        let mut request = self
            .http
            .put(format!("{}/{key}", self.upload_base()?))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if public {
            request = request.header("x-amz-acl", "public-read");
        }
        if let Some(token) = self.config.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        ensure_success(PROVIDER, response).await?;

        debug!(key, size, content_type, public, "Stored object");
        self.public_url(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_prefers_public_base() {
        let store = HttpObjectStore::new(
            reqwest::Client::new(),
            StorageConfig {
                upload_url: Some("https://upload.example.com/bucket/".to_string()),
                public_url: Some("https://cdn.example.com".to_string()),
                token: None,
            },
        );
        assert_eq!(
            store.public_url("/closet-uploads/a.png").unwrap(),
            "https://cdn.example.com/closet-uploads/a.png"
        );
    }

    #[test]
    fn test_public_url_falls_back_to_upload_base() {
        let store = HttpObjectStore::new(
            reqwest::Client::new(),
            StorageConfig {
                upload_url: Some("https://upload.example.com/bucket/".to_string()),
                ..StorageConfig::default()
            },
        );
        assert_eq!(
            store.public_url("a.png").unwrap(),
            "https://upload.example.com/bucket/a.png"
        );
    }

    #[test]
    fn test_missing_upload_url_is_configuration_error() {
        let store = HttpObjectStore::new(reqwest::Client::new(), StorageConfig::default());
        assert!(store.public_url("a.png").unwrap_err().is_configuration());
    }
}
