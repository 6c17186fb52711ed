//! Time parsing for `--start-time` / `--end-time`.
//!
//! Accepts absolute timestamps (RFC 3339, a handful of naive layouts, epoch
//! seconds) and relative phrases such as `5mins ago` or `1 hour ago`.
//! Naive values are read as UTC.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use thiserror::Error;

/// Naive date-time layouts tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*([a-z]+)\s+ago$").expect("relative time pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("Unable to parse the time provided by '{label}'")]
    Unparsable { label: String, value: String },
}

/// Parse a user supplied time value.
///
/// `label` names the option in error messages (e.g. `start-time`).
/// Returns `Ok(None)` for absent or blank input so callers can apply their own default.
pub fn parse_time(
    raw: Option<&str>,
    label: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, TimeParseError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }

    parse_absolute(value)
        .or_else(|| parse_relative(value, now))
        .map(Some)
        .ok_or_else(|| TimeParseError::Unparsable {
            label: label.to_string(),
            value: raw.to_string(),
        })
}

fn parse_absolute(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        let secs: i64 = value.parse().ok()?;
        return DateTime::from_timestamp(secs, 0);
    }

    None
}

fn parse_relative(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lowered = value.to_ascii_lowercase();
    if lowered == "now" {
        return Some(now);
    }

    let captures = RELATIVE.captures(&lowered)?;
    let amount: i64 = captures[1].parse().ok()?;
    let delta = unit_delta(&captures[2], amount)?;
    now.checked_sub_signed(delta)
}

fn unit_delta(unit: &str, amount: i64) -> Option<TimeDelta> {
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => TimeDelta::try_seconds(amount),
        "m" | "min" | "mins" | "minute" | "minutes" => TimeDelta::try_minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => TimeDelta::try_hours(amount),
        "d" | "day" | "days" => TimeDelta::try_days(amount),
        "w" | "week" | "weeks" => TimeDelta::try_weeks(amount),
        _ => None,
    }
}
