//! Normalized query description and its mapping to provider parameters.

use std::collections::BTreeMap;

use crate::output::Format;

/// Flat upstream parameter map, already normalized to canonical strings.
///
/// `BTreeMap` keeps names in byte order, which the cache key relies on.
pub type QueryParams = BTreeMap<String, String>;

/// San Francisco, the center used by the earthquake and felt surfaces.
pub const SF_BAY_AREA: Region = Region {
    latitude: 37.7749,
    longitude: -122.4194,
    radius_km: 100.0,
};

/// Circular search region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

/// Query window in canonical `YYYY-MM-DDTHH:MM:SS` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

/// One inbound request, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub window: TimeWindow,
    pub region: Option<Region>,
    pub min_magnitude: Option<f64>,
    pub min_felt_reports: Option<i64>,
    pub tsunami_only: bool,
    pub format: Format,
    /// Caller's name for the region, echoed in tsunami metadata
    pub region_label: Option<String>,
    /// Length of a look-back window, echoed in tsunami metadata
    pub lookback_hours: Option<u32>,
}

impl QuerySpec {
    /// Start building a spec for the given window.
    #[must_use]
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            region: None,
            min_magnitude: None,
            min_felt_reports: None,
            tsunami_only: false,
            format: Format::default(),
            region_label: None,
            lookback_hours: None,
        }
    }

    #[must_use]
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    #[must_use]
    pub fn min_magnitude(mut self, min: f64) -> Self {
        self.min_magnitude = Some(min);
        self
    }

    #[must_use]
    pub fn min_felt_reports(mut self, min: i64) -> Self {
        self.min_felt_reports = Some(min);
        self
    }

    #[must_use]
    pub fn tsunami_only(mut self) -> Self {
        self.tsunami_only = true;
        self
    }

    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.region_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn lookback_hours(mut self, hours: u32) -> Self {
        self.lookback_hours = Some(hours);
        self
    }

    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// The exact parameters sent upstream.
    ///
    /// Felt threshold, tsunami flag, labels and output format are applied
    /// after the cache layer and never reach this map, so they never
    /// influence the cache key.
    #[must_use]
    pub fn upstream_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert("format".into(), "geojson".into());
        params.insert("starttime".into(), self.window.start.clone());
        params.insert("endtime".into(), self.window.end.clone());
        if let Some(min) = self.min_magnitude {
            params.insert("minmagnitude".into(), canonical_number(min));
        }
        if let Some(region) = self.region {
            params.insert("latitude".into(), canonical_number(region.latitude));
            params.insert("longitude".into(), canonical_number(region.longitude));
            params.insert("maxradiuskm".into(), canonical_number(region.radius_km));
        }
        params
    }
}

/// Canonical string form of a numeric parameter.
///
/// Integral values print without a fractional part (`100`), everything
/// else uses the shortest round-tripping representation (`2.5`,
/// `-122.4194`). Equal numbers always produce equal strings.
#[must_use]
pub fn canonical_number(value: f64) -> String {
    // -0.0 == 0.0
    let value = if value == 0.0 { 0.0 } else { value };
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
