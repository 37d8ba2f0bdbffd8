//! Error types for quakecache.
//!
//! Uses `thiserror` for library-style error definitions. Three layers:
//! [`GatewayError`] is what callers of the pipeline see, [`UpstreamError`]
//! is the USGS client's own failure, and [`CacheError`] is the soft failure
//! of the cache store that never leaves the fetcher.

use thiserror::Error;

/// Errors surfaced to callers of the query pipeline.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Caller-supplied value failed validation
    #[error("{message}")]
    BadRequest { field: String, message: String },

    /// Upstream provider could not produce a usable result
    #[error("Error fetching data: {cause}")]
    UpstreamUnavailable { cause: String },

    /// Result could not be serialized in the requested format
    #[error("Failed to encode response: {0}")]
    Encoding(String),

    /// Worker task died before producing a result
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Build a validation error for the given field.
    pub fn bad_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        Self::UpstreamUnavailable {
            cause: err.to_string(),
        }
    }
}

/// Errors raised by the upstream USGS client.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// API returned an error status
    #[error("USGS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Soft failures of the cache store. Always recovered by fetching upstream.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store unreachable or command failed
    #[error("cache store error: {0}")]
    Store(#[from] redis::RedisError),

    /// No pooled connection became available in time
    #[error("cache store unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// Stored value could not be decoded
    #[error("cached value is corrupt: {0}")]
    Decode(#[from] serde_json::Error),
}
