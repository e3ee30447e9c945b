//! Tolerant cell-level coercion.
//!
//! Every function here maps malformed input to `None` (or returns the input
//! unchanged for pure string cleanups) and never panics; a bad cell must not
//! abort its row. Date parsing walks an ordered format list, first parse
//! wins, so `01/05/2024` reads month-first as January 5 2024.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Date-only formats, in priority order: ISO first, then US month-first,
/// then day-first for extracts that use it unambiguously.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%d/%m/%Y",
];

/// Timestamp formats some exports use for date columns; the time part is
/// discarded.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

static AMOUNT_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[$€£,\s]").expect("amount noise pattern is valid")
});

/// Parse a date-like cell, yielding `None` on malformed input.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    None
}

/// Parse an amount-like cell as a decimal, stripping currency symbols,
/// thousands separators and whitespace. Accounting-style parentheses read as
/// negative. Non-numeric input yields `None`.
pub fn parse_amount(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (body, negative) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned = AMOUNT_NOISE.replace_all(body, "");
    if cleaned.is_empty() {
        return None;
    }

    let parsed: f64 = cleaned.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    Some(if negative { -parsed } else { parsed })
}

/// First letter uppercased, the rest lowercased: `"fEMALE"` -> `"Female"`.
pub fn capitalize(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Every whitespace-separated word capitalized: `"private insurance"` ->
/// `"Private Insurance"`.
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}
