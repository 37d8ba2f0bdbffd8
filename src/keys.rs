//! Cache key construction.
//!
//! The only place cache keys are built. A key is the namespace tag followed
//! by the compact JSON encoding of the upstream parameters with names in
//! ascending byte order, e.g.
//! `usgs_data:{"endtime":"2024-01-02T00:00:00","format":"geojson",...}`.

use std::fmt;

use crate::query::QueryParams;

/// Namespace prefix for every entry this gateway writes.
pub const NAMESPACE: &str = "usgs_data:";

/// A deterministic cache key for one upstream query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the key for a parameter map.
///
/// Two maps with the same pairs give byte-identical keys no matter how
/// they were built.
#[must_use]
pub fn build_key(params: &QueryParams) -> CacheKey {
    let mut key = String::from(NAMESPACE);
    key.push('{');
    for (i, (name, value)) in params.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        push_json_string(&mut key, name);
        key.push(':');
        push_json_string(&mut key, value);
    }
    key.push('}');
    CacheKey(key)
}

// serde_json's string escaping, so separators inside values can't collide.
fn push_json_string(out: &mut String, s: &str) {
    out.push_str(&serde_json::Value::from(s).to_string());
}
