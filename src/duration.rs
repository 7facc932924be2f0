//! Duration strings for certificate lifetimes.
//!
//! Configuration files and the `--expires` flag describe lifetimes as a
//! sequence of decimal numbers each followed by a unit, such as `24h`,
//! `1h30m` or `8760h`. Accepted units are `ns`, `us` (or `µs`),
//! `ms`, `s`, `m` and `h`. A bare integer is read as seconds.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

// Nanoseconds per unit
const UNITS: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Parse a duration string such as `24h` or `1h30m`.
pub fn parse(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text.is_empty() {
        bail!("empty duration");
    }
    if let Ok(seconds) = text.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let overflow = || anyhow!("duration [{}] out of range", text);
    let mut total: u64 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let (whole, after_whole) = leading_int(rest).ok_or_else(overflow)?;
        let whole_len = rest.len() - after_whole.len();
        rest = after_whole;

        let mut fraction = 0u64;
        let mut fraction_scale = 1u64;
        let mut fraction_len = 0;
        if let Some(after_dot) = rest.strip_prefix('.') {
            let (digits, after_fraction) = leading_fraction(after_dot);
            (fraction, fraction_scale) = digits;
            fraction_len = after_dot.len() - after_fraction.len();
            rest = after_fraction;
        }
        if whole_len == 0 && fraction_len == 0 {
            bail!("expected a number in duration [{}]", text);
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        if unit.is_empty() {
            bail!("missing unit in duration [{}]", text);
        }
        let unit_nanos = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| anyhow!("unknown unit [{}] in duration [{}]", unit, text))?;
        rest = &rest[unit_len..];

        let mut value = whole.checked_mul(unit_nanos).ok_or_else(overflow)?;
        if fraction > 0 {
            // at most 3.6e12 ns per hour, exact enough in f64
            let fraction_nanos =
                (fraction as f64 * (unit_nanos as f64 / fraction_scale as f64)) as u64;
            value = value.checked_add(fraction_nanos).ok_or_else(overflow)?;
        }
        total = total.checked_add(value).ok_or_else(overflow)?;
    }

    Ok(Duration::from_nanos(total))
}

/// Leading decimal digits as an integer, or `None` on overflow.
fn leading_int(text: &str) -> Option<(u64, &str)> {
    let len = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let value = text[..len].bytes().try_fold(0u64, |value, digit| {
        value
            .checked_mul(10)?
            .checked_add(u64::from(digit - b'0'))
    })?;
    Some((value, &text[len..]))
}

/// Leading fractional digits as `(digits, 10^count)`. Digits past u64
/// precision are consumed and ignored.
fn leading_fraction(text: &str) -> ((u64, u64), &str) {
    let len = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let mut value = 0u64;
    let mut scale = 1u64;
    for digit in text[..len].bytes() {
        let next = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(digit - b'0')));
        match (next, scale.checked_mul(10)) {
            (Some(next), Some(next_scale)) => {
                value = next;
                scale = next_scale;
            }
            _ => break,
        }
    }
    ((value, scale), &text[len..])
}

/// Format a duration using whole hours, minutes and seconds, e.g. `8760h0m0s`.
pub fn format(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}h{}m{}s", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

/// Serde adapter for `expires` fields.
pub mod serde_duration {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a duration such as \"24h\" or a number of seconds")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
                super::parse(value).map_err(|e| E::custom(e.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
                Ok(Duration::from_secs(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
                u64::try_from(value)
                    .map(Duration::from_secs)
                    .map_err(|_| E::custom("duration must not be negative"))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}
