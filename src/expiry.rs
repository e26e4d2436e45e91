//! Expiry Parsing
//!
//! Turns the `ttl` / `expires_at` write parameters into an absolute expiry,
//! and formats expiries for the replication wire.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::ExpiryError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Fraction digits beyond this are ignored; they are below nanosecond precision.
const MAX_FRACTION_DIGITS: u32 = 20;

// == Resolve Expiry ==
/// Resolves the expiry of a write from its optional parameters.
///
/// Empty strings count as absent. A `ttl` takes precedence over `expires_at`,
/// which is then not inspected at all. With neither, the item never expires.
pub fn resolve_expiry(
    ttl: Option<&str>,
    expires_at: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ExpiryError> {
    if let Some(ttl) = ttl.filter(|s| !s.is_empty()) {
        let delta = parse_duration(ttl)?;
        return now
            .checked_add_signed(delta)
            .map(Some)
            .ok_or_else(|| ExpiryError::OutOfRange(ttl.to_string()));
    }

    match expires_at.filter(|s| !s.is_empty()) {
        Some(expires_at) => parse_timestamp(expires_at).map(Some),
        None => Ok(None),
    }
}

// == Parse Timestamp ==
/// Parses an RFC 3339 timestamp with optional fractional seconds into UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ExpiryError> {
    DateTime::parse_from_rfc3339(input)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| ExpiryError::InvalidTimestamp {
            input: input.to_string(),
            reason: err.to_string(),
        })
}

// == Format Wire ==
/// Formats an expiry as `YYYY-MM-DDThh:mm:ssZ`, dropping sub-second precision.
pub fn format_wire(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// == Parse Duration ==
/// Parses a signed duration such as `300ms`, `-1.5h` or `2h45m`.
///
/// Each component is a decimal number with an optional fraction followed by
/// one of `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m` or `h`. A bare `0` is
/// accepted without a unit.
pub fn parse_duration(input: &str) -> Result<TimeDelta, ExpiryError> {
    let invalid = |reason| ExpiryError::InvalidDuration {
        input: input.to_string(),
        reason,
    };

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, after_whole) = take_digits(rest);
        let (fraction, after_fraction) = match after_whole.strip_prefix('.') {
            Some(tail) => take_digits(tail),
            None => ("", after_whole),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after_fraction
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_fraction.len());
        let (unit, tail) = after_fraction.split_at(unit_len);
        let scale = match unit {
            "" => return Err(invalid("missing unit")),
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3_600 * NANOS_PER_SECOND,
            _ => return Err(invalid("unknown unit")),
        };

        let whole_nanos = parse_whole(whole)
            .and_then(|n| n.checked_mul(scale))
            .ok_or_else(|| invalid("overflow"))?;
        total = total
            .checked_add(whole_nanos)
            .and_then(|t| t.checked_add(fraction_nanos(fraction, scale)))
            .filter(|t| *t <= i64::MAX as u128)
            .ok_or_else(|| invalid("overflow"))?;

        rest = tail;
    }

    // bounded by i64::MAX above
    let nanos = total as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

fn take_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn parse_whole(digits: &str) -> Option<u128> {
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

fn fraction_nanos(digits: &str, scale: u128) -> u128 {
    let mut numerator: u128 = 0;
    let mut denominator: u128 = 1;
    for digit in digits.bytes().take(MAX_FRACTION_DIGITS as usize) {
        numerator = numerator * 10 + u128::from(digit - b'0');
        denominator *= 10;
    }
    numerator * scale / denominator
}
