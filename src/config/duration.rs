//! Compact duration notation used by the role table and the CLI.
//!
//! Accepts an optional sign followed by one or more `<decimal><unit>` groups,
//! e.g. `10s`, `1.5m`, `1h30m`, `250ms`. A bare `0` is zero.

use crate::{Result, SidecarError};
use std::time::Duration;

const NANOS_PER_SEC: f64 = 1e9;

/// Parse a duration such as `30s`, `5m` or `1h30m`.
///
/// Negative non-zero durations are rejected since nothing in the sidecar can
/// wait for a negative amount of time.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let invalid = || SidecarError::InvalidDuration(text.to_string());

    let mut rest = text;
    let negative = if let Some(stripped) = rest.strip_prefix('-') {
        rest = stripped;
        true
    } else {
        rest = rest.strip_prefix('+').unwrap_or(rest);
        false
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(invalid());
        }
        let magnitude: f64 = number.parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = unit_scale(&rest[..unit_end]).ok_or_else(invalid)?;
        rest = &rest[unit_end..];

        nanos += magnitude * scale;
    }

    if negative && nanos > 0.0 {
        return Err(invalid());
    }
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Nanoseconds per unit suffix
fn unit_scale(unit: &str) -> Option<f64> {
    match unit {
        "ns" => Some(1.0),
        "us" | "µs" | "μs" => Some(1e3),
        "ms" => Some(1e6),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60.0 * NANOS_PER_SEC),
        "h" => Some(3600.0 * NANOS_PER_SEC),
        _ => None,
    }
}
