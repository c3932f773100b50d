//! Human-readable formatting of raw quantities.
//!
//! Everything here is pure: no I/O, no state. Absent values render as `N/A`.

use crate::snapshot::SecondsLeft;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

pub const NOT_AVAILABLE: &str = "N/A";

const BYTE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Scales to the largest 1024-based unit in which the value is at least 1.
///
/// `Some(1536)` → `"1.50KB"`, `Some(0)` → `"0B"`, `None` → `"N/A"`.
pub fn format_bytes(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return NOT_AVAILABLE.to_string();
    };
    if bytes == 0 {
        return "0B".to_string();
    }

    let value = bytes as f64;
    for (idx, unit) in BYTE_UNITS.iter().enumerate().rev() {
        let scale = 1024_f64.powi(idx as i32);
        if value >= scale {
            return format!("{:.2}{}", value / scale, unit);
        }
    }

    format!("{bytes}B")
}

pub fn format_duration(left: SecondsLeft) -> String {
    match left {
        SecondsLeft::Unlimited => "Unlimited".to_string(),
        SecondsLeft::Unknown => "Unknown".to_string(),
        SecondsLeft::Seconds(secs) => {
            let hours = secs / 3600;
            let mins = (secs % 3600) / 60;
            let rest = secs % 60;
            format!("{}h {}m {}s", hours, mins, rest)
        }
    }
}

/// Epoch seconds as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: Option<f64>) -> String {
    format_timestamp_in(ts, &Local)
}

pub fn format_timestamp_in<Tz>(ts: Option<f64>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(ts) = ts else {
        return NOT_AVAILABLE.to_string();
    };
    if !ts.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1e9) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_opt<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
