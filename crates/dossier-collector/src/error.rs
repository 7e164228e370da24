use std::time::Duration;

use thiserror::Error;

use crate::retry::Retryable;

/// Failure of one external provider call.
///
/// Every variant is either transient (worth retrying after a back-off) or
/// terminal; see [`Retryable::is_transient`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited (retry after {}ms)", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("call timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        ProviderError::NotFound {
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

impl Retryable for ProviderError {
    /// **Transient:** network failures, provider back-off (429), call
    /// timeouts and 5xx responses.
    ///
    /// **Terminal:** not-found, credential failures, other 4xx, malformed
    /// bodies, and an exhausted run deadline.
    fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => !e.is_decode() && !e.is_builder(),
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout { .. }
            | ProviderError::Upstream { .. } => true,
            ProviderError::NotFound { .. }
            | ProviderError::Unauthorized(_)
            | ProviderError::UnexpectedStatus { .. }
            | ProviderError::Deserialize { .. }
            | ProviderError::DeadlineExceeded
            | ProviderError::Other(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors that stop a collection before any provider call is made.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}
