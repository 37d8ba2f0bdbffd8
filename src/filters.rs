//! Post-fetch filtering of feature collections.
//!
//! One tagged variant per query surface. Filters run after the cache layer,
//! so the same cached entry can serve every variant.

use serde_json::json;

use crate::models::{Feature, FeatureCollection};
use crate::query::{QuerySpec, TimeWindow};

/// Which predicate to apply to a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultFilter {
    /// Keep features with `mag >= min`. Missing magnitude counts as 0.
    Magnitude { min: f64 },

    /// Keep features whose `felt` is present and `>= min`.
    FeltReports { min: i64 },

    /// Keep features with `tsunami > 0` and attach a metadata block.
    Tsunami {
        region_label: String,
        window: TimeWindow,
        lookback_hours: Option<u32>,
    },
}

impl ResultFilter {
    /// Pick the filter a spec asks for.
    ///
    /// Tsunami wins over felt reports, which win over magnitude. A spec with
    /// no magnitude threshold keeps every feature.
    #[must_use]
    pub fn for_spec(spec: &QuerySpec) -> Self {
        if spec.tsunami_only {
            Self::Tsunami {
                region_label: spec.region_label.clone().unwrap_or_default(),
                window: spec.window.clone(),
                lookback_hours: spec.lookback_hours,
            }
        } else if let Some(min) = spec.min_felt_reports {
            Self::FeltReports { min }
        } else {
            Self::Magnitude {
                min: spec.min_magnitude.unwrap_or(f64::NEG_INFINITY),
            }
        }
    }

    /// Check a single feature against the predicate.
    #[must_use]
    pub fn matches(&self, feature: &Feature) -> bool {
        match self {
            Self::Magnitude { min } => feature.magnitude() >= *min,
            Self::FeltReports { min } => feature.felt_reports().is_some_and(|felt| felt >= *min),
            Self::Tsunami { .. } => feature.has_tsunami_flag(),
        }
    }

    /// Produce the filtered collection, preserving feature order.
    ///
    /// The magnitude filter passes the provider's `metadata` and `bbox`
    /// through; the felt filter drops them; the tsunami filter replaces
    /// `metadata` with the region and window and drops `bbox`.
    #[must_use]
    pub fn apply(&self, data: FeatureCollection) -> FeatureCollection {
        let FeatureCollection {
            type_,
            metadata,
            features,
            bbox,
        } = data;

        let features: Vec<Feature> = features.into_iter().filter(|f| self.matches(f)).collect();

        let (metadata, bbox) = match self {
            Self::Magnitude { .. } => (metadata, bbox),
            Self::FeltReports { .. } => (None, None),
            Self::Tsunami {
                region_label,
                window,
                lookback_hours,
            } => {
                let mut block = serde_json::Map::new();
                block.insert("state".into(), json!(region_label));
                if let Some(hours) = lookback_hours {
                    block.insert("time_range".into(), json!(format!("{hours} hours")));
                }
                // The anchor is the later bound; the window reaches back from it.
                block.insert("start_time".into(), json!(window.end));
                block.insert("end_time".into(), json!(window.start));
                (Some(serde_json::Value::Object(block)), None)
            }
        };

        FeatureCollection {
            type_,
            metadata,
            features,
            bbox,
        }
    }
}
