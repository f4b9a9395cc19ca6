//! Normalization of manifest timestamps to the canonical storage form.
//!
//! Render hosts emit timestamps in whatever layout their locale settings
//! produce. Everything is normalized to `YYYY-MM-DD HH:MM:SS` (with a
//! six-digit fraction only when one is present) before persistence; a
//! value that fits no known layout is stored as null instead of failing
//! the folder.

use chrono::{DateTime, NaiveDateTime};

/// Layouts carrying a UTC offset. The offset is dropped and the wall time
/// kept as written.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y/%m/%d %H:%M:%S%.f%z",
    "%d/%m/%Y %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S%.f",
];

/// Normalize a raw manifest timestamp, returning `None` when it cannot be
/// interpreted.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(render(dt.naive_local()));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(render(dt.naive_local()));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(render(dt));
        }
    }
    None
}

fn render(dt: NaiveDateTime) -> String {
    if dt.and_utc().timestamp_subsec_micros() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}
