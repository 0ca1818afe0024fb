use sento_core::SourceError;
use thiserror::Error;

/// Errors returned by the Nominatim client.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 (or 403, which Nominatim uses for usage-policy blocks).
    #[error("geocoder throttled us, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("unexpected status {status} for {context}")]
    Status { status: u16, context: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<GeocodeError> for SourceError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::Http(e) if e.is_decode() => SourceError::Malformed {
                context: "geocoder response".to_owned(),
                reason: e.to_string(),
            },
            GeocodeError::Http(e) => SourceError::Transient(e.to_string()),
            GeocodeError::Throttled { retry_after_secs } => {
                SourceError::RateLimited { retry_after_secs }
            }
            GeocodeError::Status { status, .. } if status >= 500 => {
                SourceError::Transient(err.to_string())
            }
            GeocodeError::Deserialize { context, source } => SourceError::Malformed {
                context,
                reason: source.to_string(),
            },
            GeocodeError::Status { .. } | GeocodeError::InvalidBaseUrl { .. } => {
                SourceError::Rejected(err.to_string())
            }
        }
    }
}
