//! USGS FDSN event service client.
//!
//! Provides blocking HTTP access to the event query endpoint.
//! Uses reqwest with rustls for TLS. No caching, no filtering, no retries.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::errors::UpstreamError;
use crate::models::FeatureCollection;
use crate::query::QueryParams;

/// Default request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakecache/", env!("CARGO_PKG_VERSION"));

/// USGS FDSN event query endpoint.
pub const USGS_API_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Anything that can answer an upstream event query.
pub trait Upstream: Send + Sync {
    /// Run one query against the provider.
    fn fetch(&self, params: &QueryParams) -> Result<FeatureCollection, UpstreamError>;
}

/// Client for the USGS event query API.
pub struct UsgsClient {
    client: Client,
    base_url: String,
}

impl UsgsClient {
    /// Create a new client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl Upstream for UsgsClient {
    #[instrument(skip(self, params), fields(url = %self.base_url))]
    fn fetch(&self, params: &QueryParams) -> Result<FeatureCollection, UpstreamError> {
        debug!("querying upstream with {} params", params.len());

        let response = self.client.get(&self.base_url).query(params).send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text()?;
        let feed = parse_body(&body)?;

        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }
}

/// Parse and validate a provider response body.
///
/// # Errors
///
/// Returns an error if the body is not a GeoJSON `FeatureCollection`.
pub fn parse_body(body: &str) -> Result<FeatureCollection, UpstreamError> {
    let feed: FeatureCollection = serde_json::from_str(body)?;
    feed.validate()?;
    Ok(feed)
}
