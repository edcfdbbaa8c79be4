//! Shared HTTP plumbing for the provider clients.

use std::time::Duration;

use crate::error::{ProviderError, Result};

pub const USER_AGENT: &str = concat!("closet/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for every provider call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the `reqwest::Client` shared by all providers.
///
/// One client means one connection pool across the model, inference,
/// storage and weather endpoints.
pub fn build_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Ensure the response has a success status code.
///
/// Returns the response unchanged on success, or a
/// [`ProviderError::Api`] with the status and body text on failure.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Strip a trailing slash so `format!("{base}/path")` never doubles it.
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
