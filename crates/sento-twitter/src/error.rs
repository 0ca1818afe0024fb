use sento_core::SourceError;
use thiserror::Error;

/// Errors returned by the Twitter API client.
#[derive(Debug, Error)]
pub enum TwitterError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bearer-token exchange was refused.
    #[error("token exchange failed: {0}")]
    Auth(String),

    /// A request carrying a cached bearer token came back 401. The token has
    /// been dropped; the next request re-authenticates.
    #[error("bearer token rejected for {0}")]
    Unauthorized(String),

    /// HTTP 429.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Any other non-2xx response.
    #[error("unexpected status {status} for {context}")]
    Status { status: u16, context: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body parsed but broke an invariant of the endpoint.
    #[error("malformed response for {context}: {reason}")]
    Malformed { context: String, reason: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<TwitterError> for SourceError {
    fn from(err: TwitterError) -> Self {
        match err {
            TwitterError::Http(e) => {
                if e.is_decode() {
                    SourceError::Malformed {
                        context: e.url().map_or_else(String::new, ToString::to_string),
                        reason: e.to_string(),
                    }
                } else if e.status().is_some_and(|s| s.is_client_error()) {
                    SourceError::Rejected(e.to_string())
                } else {
                    SourceError::Transient(e.to_string())
                }
            }
            TwitterError::RateLimited { retry_after_secs } => {
                SourceError::RateLimited { retry_after_secs }
            }
            TwitterError::Unauthorized(_) => SourceError::Transient(err.to_string()),
            TwitterError::Status { status, .. } if status >= 500 => {
                SourceError::Transient(err.to_string())
            }
            TwitterError::Deserialize { context, source } => SourceError::Malformed {
                context,
                reason: source.to_string(),
            },
            TwitterError::Malformed { context, reason } => {
                SourceError::Malformed { context, reason }
            }
            TwitterError::Auth(_)
            | TwitterError::Status { .. }
            | TwitterError::InvalidBaseUrl { .. } => SourceError::Rejected(err.to_string()),
        }
    }
}
