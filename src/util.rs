// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" export handling (numbers with
// locale separators, several date layouts, placeholder text) so the rest of
// the code can assume clean, typed values.
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about the
/// formatting issues that are common in ERP exports.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Removes every kind of whitespace, including the no-break spaces used as
///   thousands separators (`1 234,56`).
/// - Treats a lone comma as the decimal separator; when both `,` and `.`
///   appear the comma is a thousands separator (`1,234.56`).
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s: String = s?.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s = if s.contains('.') {
        s.replace(',', "")
    } else {
        s.replace(',', ".")
    };
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_u32_safe(s: Option<&str>) -> Option<u32> {
    // Counters sometimes arrive as `3.0` from spreadsheet round-trips.
    let v = parse_f64_safe(s)?;
    if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return None;
    }
    Some(v as u32)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Parse the date layouts seen in exports: ISO dates, ISO timestamps with or
/// without a `Z`/offset suffix, and `dd.mm.yyyy`. Time of day is dropped.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc().date());
    }
    let s = s.trim_end_matches('Z');
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Actual start/end dates at or before 1971 are epoch fillers, not real dates.
pub fn plausible_actual_date(d: Option<NaiveDate>) -> Option<NaiveDate> {
    d.filter(|d| d.year() > 1971)
}

pub fn days_diff(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(mut v: Vec<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        (v[mid - 1] + v[mid]) / 2.0
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

pub fn round2(v: f64) -> f64 {
    round_to(v, 2)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if decimals > 0 {
        res.push('.');
        res.push_str(frac);
        for _ in frac.len()..decimals {
            res.push('0');
        }
    }
    // No "-0.00" for values that round to zero.
    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if n.is_sign_negative() && !is_zero {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
