//! Gateway configuration.

use std::time::Duration;

use crate::client::{REQUEST_TIMEOUT, USGS_API_URL};
use crate::fetcher::CACHE_TTL;

/// Recognized configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub cache_store_host: String,
    pub cache_store_port: u16,
    /// Fixed at 30 seconds; not configurable.
    pub cache_ttl: Duration,
    pub upstream_base_url: String,
    pub upstream_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_store_host: "localhost".to_string(),
            cache_store_port: 6379,
            cache_ttl: CACHE_TTL,
            upstream_base_url: USGS_API_URL.to_string(),
            upstream_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Config with the given store address and upstream, other values default.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, upstream: impl Into<String>) -> Self {
        Self {
            cache_store_host: host.into(),
            cache_store_port: port,
            upstream_base_url: upstream.into(),
            ..Self::default()
        }
    }
}
