//! Errors shared by all provider clients.

use thiserror::Error;

/// Errors that can occur when talking to an external provider.
///
/// `MissingCredential` is the configuration case: it is raised before any
/// request is built. Every other variant is a transient provider failure
/// that the AI workflows convert into their fallback values.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Missing credential for {provider}: set {variable}")]
    MissingCredential {
        provider: &'static str,
        variable: &'static str,
    },

    /// The HTTP request itself failed (network, DNS, TLS, timeout, body decode)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The provider answered 2xx but the body is not what we expect
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },
}

impl ProviderError {
    /// True for errors caused by local configuration rather than the provider.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::MissingCredential { .. })
    }

    pub(crate) fn invalid(provider: &'static str, reason: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
