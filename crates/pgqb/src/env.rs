//! Typed environment variable lookups.
//!
//! Every lookup returns the supplied default when the variable is unset, not
//! valid unicode, or fails to parse. The `parse_*` functions expose the same
//! parsing rules for values obtained elsewhere.

use chrono::{DateTime, Utc};
use std::time::Duration;

fn lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn string(key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

pub fn u8(key: &str, default: u8) -> u8 {
    lookup(key).and_then(|v| parse_uint(&v)).unwrap_or(default)
}

pub fn i32(key: &str, default: i32) -> i32 {
    lookup(key).and_then(|v| parse_int(&v)).unwrap_or(default)
}

pub fn i64(key: &str, default: i64) -> i64 {
    lookup(key).and_then(|v| parse_int(&v)).unwrap_or(default)
}

pub fn u32(key: &str, default: u32) -> u32 {
    lookup(key).and_then(|v| parse_uint(&v)).unwrap_or(default)
}

pub fn u64(key: &str, default: u64) -> u64 {
    lookup(key).and_then(|v| parse_uint(&v)).unwrap_or(default)
}

pub fn usize(key: &str, default: usize) -> usize {
    lookup(key).and_then(|v| parse_uint(&v)).unwrap_or(default)
}

pub fn bool(key: &str, default: bool) -> bool {
    lookup(key).and_then(|v| parse_bool(&v)).unwrap_or(default)
}

pub fn f64(key: &str, default: f64) -> f64 {
    lookup(key).and_then(|v| parse_f64(&v)).unwrap_or(default)
}

/// RFC 3339 timestamp, e.g. `2006-01-02T15:04:05+07:00`.
pub fn datetime(key: &str, default: DateTime<Utc>) -> DateTime<Utc> {
    lookup(key).and_then(|v| parse_datetime(&v)).unwrap_or(default)
}

/// Duration such as `300ms`, `1.5h` or `2h45m`.
pub fn duration(key: &str, default: Duration) -> Duration {
    lookup(key).and_then(|v| parse_duration(&v)).unwrap_or(default)
}

/// Split a base prefix: `0x`, `0o`, `0b`, or a bare leading `0` for octal.
fn split_radix(s: &str) -> (u32, &str) {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => return (16, &s[2..]),
            b'o' | b'O' => return (8, &s[2..]),
            b'b' | b'B' => return (2, &s[2..]),
            _ => return (8, &s[1..]),
        }
    }
    (10, s)
}

fn parse_magnitude(s: &str) -> Option<u128> {
    let (radix, digits) = split_radix(s);
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    u128::from_str_radix(&digits, radix).ok()
}

/// Signed integer with an optional sign and base prefix.
pub fn parse_int<T: TryFrom<i128>>(s: &str) -> Option<T> {
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = i128::try_from(parse_magnitude(body)?).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).ok()
}

/// Unsigned integer with an optional base prefix; no sign is accepted.
pub fn parse_uint<T: TryFrom<u128>>(s: &str) -> Option<T> {
    T::try_from(parse_magnitude(s)?).ok()
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

pub fn parse_f64(s: &str) -> Option<f64> {
    s.parse().ok()
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Sequence of decimal numbers with unit suffixes (`ns`, `us`/`µs`, `ms`,
/// `s`, `m`, `h`). Negative durations are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let n: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        nanos += n * scale;
        rest = &rest[unit_end..];
    }

    Some(Duration::from_nanos(nanos.round() as u64))
}
