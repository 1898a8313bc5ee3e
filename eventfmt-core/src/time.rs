//! Timestamp rendering for text output.

use std::fmt::{Display, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

/// RFC 3339-style default: `2013-09-24T11:40:47+0000`.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Render `when` (seconds since the epoch) in the local timezone.
///
/// Returns `default` when there is no time, no format, or the time cannot
/// be rendered with the given pattern.
pub fn format_time(when: Option<f64>, time_format: Option<&str>, default: &str) -> String {
    format_time_in(&Local, when, time_format, default)
}

/// [`format_time`] in an explicit timezone.
///
/// `%f` is microseconds, zero-padded to six digits.
pub fn format_time_in<Tz>(
    tz: &Tz,
    when: Option<f64>,
    time_format: Option<&str>,
    default: &str,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (Some(when), Some(time_format)) = (when, time_format) else {
        return default.to_string();
    };
    if !when.is_finite() {
        return default.to_string();
    }

    let mut secs = when.floor();
    let mut micros = ((when - secs) * 1e6).round() as u32;
    if micros >= 1_000_000 {
        secs += 1.0;
        micros -= 1_000_000;
    }
    let Some(utc) = DateTime::from_timestamp(secs as i64, micros * 1000) else {
        debug!(when, "timestamp out of range");
        return default.to_string();
    };

    let pattern = expand_micros(time_format, micros);
    let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        debug!(time_format, "invalid time format");
        return default.to_string();
    }

    let mut out = String::new();
    match write!(out, "{}", utc.with_timezone(tz).format_with_items(items.iter())) {
        Ok(()) => out,
        Err(_) => default.to_string(),
    }
}

/// Replace `%f` with six-digit microseconds, leaving `%%` alone.
fn expand_micros(pattern: &str, micros: u32) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('f') => out.push_str(&format!("{micros:06}")),
            Some(next) => {
                out.push('%');
                out.push(next);
            }
            None => out.push('%'),
        }
    }
    out
}
