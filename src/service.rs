//! The query pipeline and its three surfaces.
//!
//! Every surface follows the same path: validate dates, build a
//! [`QuerySpec`], fetch through the cache, apply the spec's filter, format.
//! Validation always completes before any cache or upstream work.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{Upstream, UsgsClient};
use crate::config::GatewayConfig;
use crate::dates;
use crate::errors::{GatewayError, UpstreamError};
use crate::fetcher::CachedFetcher;
use crate::filters::ResultFilter;
use crate::output::{self, Format, Formatted};
use crate::query::{QuerySpec, SF_BAY_AREA, TimeWindow};
use crate::store::{CacheStore, RedisStore};

/// Default magnitude floor for every surface.
pub const DEFAULT_MIN_MAGNITUDE: f64 = 2.0;

/// Default felt-report floor for the felt surface.
pub const DEFAULT_MIN_FELT_REPORTS: i64 = 10;

/// Default look-back for the tsunami surface, in hours.
pub const DEFAULT_TIME_RANGE_HOURS: u32 = 24;

/// Longest look-back accepted by the tsunami surface, in hours.
pub const MAX_TIME_RANGE_HOURS: u32 = 168;

fn default_format() -> String {
    "json".to_string()
}

fn default_min_magnitude() -> f64 {
    DEFAULT_MIN_MAGNITUDE
}

fn default_min_felt_reports() -> i64 {
    DEFAULT_MIN_FELT_REPORTS
}

fn default_time_range() -> u32 {
    DEFAULT_TIME_RANGE_HOURS
}

/// All earthquakes around San Francisco above a magnitude.
#[derive(Debug, Clone, Deserialize)]
pub struct EarthquakeRequest {
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: f64,
}

impl EarthquakeRequest {
    /// Validate and convert into a spec.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadRequest`] for malformed dates.
    pub fn into_spec(self) -> Result<QuerySpec, GatewayError> {
        let window = validated_window(&self.start_time, &self.end_time)?;
        Ok(QuerySpec::new(window)
            .region(SF_BAY_AREA)
            .min_magnitude(self.min_magnitude)
            .format(Format::from_name(&self.format)))
    }
}

/// San Francisco earthquakes with at least some "Did You Feel It?" reports.
#[derive(Debug, Clone, Deserialize)]
pub struct FeltRequest {
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_min_felt_reports")]
    pub min_felt_reports: i64,
}

impl FeltRequest {
    /// Validate and convert into a spec.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadRequest`] for malformed dates.
    pub fn into_spec(self) -> Result<QuerySpec, GatewayError> {
        let window = validated_window(&self.start_time, &self.end_time)?;
        Ok(QuerySpec::new(window)
            .region(SF_BAY_AREA)
            .min_magnitude(DEFAULT_MIN_MAGNITUDE)
            .min_felt_reports(self.min_felt_reports)
            .format(Format::from_name(&self.format)))
    }
}

/// Query-string half of a tsunami request; the state comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct TsunamiParams {
    pub start_time: String,
    #[serde(default = "default_time_range")]
    pub time_range: u32,
    #[serde(default = "default_format")]
    pub format: String,
}

/// Tsunami-flagged events in the hours before `start_time`.
#[derive(Debug, Clone)]
pub struct TsunamiRequest {
    pub state: String,
    pub params: TsunamiParams,
}

impl TsunamiRequest {
    /// Validate and convert into a spec.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadRequest`] for a malformed `start_time` or
    /// a `time_range` outside `1..=168`.
    pub fn into_spec(self) -> Result<QuerySpec, GatewayError> {
        let hours = self.params.time_range;
        if !(1..=MAX_TIME_RANGE_HOURS).contains(&hours) {
            return Err(GatewayError::bad_request(
                "time_range",
                format!("time_range must be between 1 and {MAX_TIME_RANGE_HOURS} hours, got {hours}"),
            ));
        }

        let (earliest, anchor) = dates::looking_back(&self.params.start_time, hours, "Start_time")?;
        info!("fetching tsunami data from {earliest} to {anchor}");

        Ok(QuerySpec::new(TimeWindow {
            start: earliest,
            end: anchor,
        })
        .min_magnitude(DEFAULT_MIN_MAGNITUDE)
        .tsunami_only()
        .labeled(self.state)
        .lookback_hours(hours)
        .format(Format::from_name(&self.params.format)))
    }
}

fn validated_window(start: &str, end: &str) -> Result<TimeWindow, GatewayError> {
    Ok(TimeWindow {
        start: dates::validate(start, "Start_time")?,
        end: dates::validate(end, "end_time")?,
    })
}

/// Health report for the service and its cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub cache_status: &'static str,
}

/// Shared entry point for all query surfaces.
#[derive(Clone)]
pub struct QueryService {
    fetcher: CachedFetcher,
}

impl QueryService {
    #[must_use]
    pub fn new(fetcher: CachedFetcher) -> Self {
        Self { fetcher }
    }

    /// Wire up the production store and upstream client.
    ///
    /// An unreachable store is not an error: the service runs uncached.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        let store = RedisStore::connect(&config.cache_store_host, config.cache_store_port)
            .map(|s| Arc::new(s) as Arc<dyn CacheStore>);
        let upstream: Arc<dyn Upstream> = Arc::new(UsgsClient::new(
            config.upstream_base_url.clone(),
            config.upstream_timeout,
        )?);
        Ok(Self::new(CachedFetcher::new(store, upstream)))
    }

    /// Run one spec through fetch, filter and format.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamUnavailable`] if the data cannot be
    /// fetched, or [`GatewayError::Encoding`] if it cannot be formatted.
    pub fn run(&self, spec: &QuerySpec) -> Result<Formatted, GatewayError> {
        let raw = self.fetcher.fetch(&spec.upstream_params())?;
        let filtered = ResultFilter::for_spec(spec).apply(raw);
        output::format(&filtered, spec.format)
    }

    /// Report liveness and whether the cache store answers.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let connected = self.fetcher.store().is_some_and(|s| s.ping().is_ok());
        HealthReport {
            status: "healthy",
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            cache_status: if connected { "connected" } else { "disconnected" },
        }
    }
}
