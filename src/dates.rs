//! Timestamp validation for upstream queries.
//!
//! The provider expects local-naive ISO-8601 timestamps of the exact form
//! `YYYY-MM-DDTHH:MM:SS`. Anything else is rejected before any cache or
//! upstream work is done.

use chrono::{Duration, NaiveDateTime};

use crate::errors::GatewayError;

/// Canonical wire format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Length of a canonical timestamp in bytes.
const TIMESTAMP_LEN: usize = 19;

/// Length of `YYYY-MM-DD`.
const DATE_LEN: usize = 10;

/// Length of `YYYY-MM-DDTHH:MM`.
const MINUTES_LEN: usize = 16;

/// Validate a caller-supplied timestamp.
///
/// Returns the input unchanged when it is already canonical.
///
/// # Errors
///
/// Returns [`GatewayError::BadRequest`] naming `field` if the value does not
/// match `YYYY-MM-DDTHH:MM:SS` or is not a real calendar time.
pub fn validate(raw: &str, field: &str) -> Result<String, GatewayError> {
    parse(raw, field).map(|_| raw.to_string())
}

/// Parse a canonical timestamp, with the same rules as [`validate`].
///
/// # Errors
///
/// Returns [`GatewayError::BadRequest`] naming `field` on any mismatch.
pub fn parse(raw: &str, field: &str) -> Result<NaiveDateTime, GatewayError> {
    if !has_canonical_shape(raw) {
        return Err(invalid(field));
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|_| invalid(field))
}

/// Render a timestamp in the canonical wire format.
#[must_use]
pub fn format(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a window anchor.
///
/// Besides the canonical form, a bare date (`YYYY-MM-DD`) and a timestamp
/// without seconds (`YYYY-MM-DDTHH:MM`) are accepted; the missing fields
/// are zero.
///
/// # Errors
///
/// Returns [`GatewayError::BadRequest`] naming `field` for any other shape.
pub fn parse_anchor(raw: &str, field: &str) -> Result<NaiveDateTime, GatewayError> {
    match raw.len() {
        DATE_LEN => parse(&format!("{raw}T00:00:00"), field),
        MINUTES_LEN => parse(&format!("{raw}:00"), field),
        _ => parse(raw, field),
    }
}

/// Resolve a window that ends at `anchor` and reaches back `hours`.
///
/// Returns `(earliest, anchor)` as canonical strings.
///
/// # Errors
///
/// Returns [`GatewayError::BadRequest`] if `anchor` is malformed or the
/// subtraction leaves the representable range.
pub fn looking_back(anchor: &str, hours: u32, field: &str) -> Result<(String, String), GatewayError> {
    let end = parse_anchor(anchor, field)?;
    let start = end
        .checked_sub_signed(Duration::hours(i64::from(hours)))
        .ok_or_else(|| invalid("End_time"))?;

    let earliest = validate(&format(start), "End_time")?;
    Ok((earliest, format(end)))
}

// chrono's `%Y` accepts signed and short years and `%m` accepts a single
// digit, so the fixed layout is checked byte by byte first.
fn has_canonical_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != TIMESTAMP_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b'T',
        13 | 16 => b == b':',
        _ => b.is_ascii_digit(),
    })
}

fn invalid(field: &str) -> GatewayError {
    GatewayError::bad_request(
        field,
        format!(
            "Invalid {field}. Please use format: YYYY-MM-DDTHH:MM:SS (example: 2014-01-01T00:00:00)"
        ),
    )
}
