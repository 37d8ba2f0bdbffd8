//! Data models for USGS FDSN event query responses.
//!
//! The gateway treats the GeoJSON document as opaque pass-through: only the
//! `properties` fields inspected by filters are given typed accessors,
//! everything else is kept verbatim so it can be cached and re-serialized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::UpstreamError;

/// Expected value of the top-level `type` field.
pub const FEATURE_COLLECTION: &str = "FeatureCollection";

/// Top-level GeoJSON response from the event service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Feed metadata, or gateway metadata after the tsunami filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Earthquake events
    #[serde(default)]
    pub features: Vec<Feature>,

    /// Bounding box of the result set, when the provider sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Value>,
}

impl FeatureCollection {
    /// Build a bare collection from features.
    #[cfg(test)]
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: FEATURE_COLLECTION.to_string(),
            metadata: None,
            features,
            bbox: None,
        }
    }

    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), UpstreamError> {
        if self.type_ != FEATURE_COLLECTION {
            return Err(UpstreamError::InvalidResponse(format!(
                "expected type '{FEATURE_COLLECTION}', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }
}

/// A single earthquake event.
///
/// `properties` is kept as a raw map; `rest` holds `type`, `id`,
/// `geometry` and whatever else the provider sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Event properties
    #[serde(default)]
    pub properties: Map<String, Value>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Feature {
    /// Build a feature from its properties alone.
    #[cfg(test)]
    #[must_use]
    pub fn from_properties(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            rest: Map::new(),
        }
    }

    /// Magnitude, 0.0 when absent or not numeric.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.properties
            .get("mag")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Number of "Did You Feel It?" reports.
    ///
    /// `None` when the property is absent, null, or cannot be read as an
    /// integer. Fractional values truncate toward zero; numeric strings are
    /// accepted.
    #[must_use]
    pub fn felt_reports(&self) -> Option<i64> {
        match self.properties.get("felt")? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the provider flagged a tsunami: any positive `tsunami` value.
    #[must_use]
    pub fn has_tsunami_flag(&self) -> bool {
        self.properties
            .get("tsunami")
            .and_then(Value::as_f64)
            .is_some_and(|t| t > 0.0)
    }
}
