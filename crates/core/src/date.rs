//! FHIR date, time and dateTime helpers
//!
//! Partial values are accepted on input (`2020`, `2020-10`, `13:30`) and
//! padded with the earliest instant. Date-times are always rendered in UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

pub const FHIR_DATE_FORMAT: &str = "%Y-%m-%d";
pub const FHIR_TIME_FORMAT: &str = "%H:%M:%S";
pub const FHIR_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const FHIR_DATE_LEN: usize = 10;
const FHIR_TIME_LEN: usize = 8;

pub fn format_fhir_date(date: &NaiveDate) -> String {
    date.format(FHIR_DATE_FORMAT).to_string()
}

pub fn format_fhir_time(time: &NaiveTime) -> String {
    time.format(FHIR_TIME_FORMAT).to_string()
}

pub fn format_fhir_date_time<Tz: TimeZone>(date_time: &DateTime<Tz>) -> String {
    date_time
        .with_timezone(&Utc)
        .format(FHIR_DATE_TIME_FORMAT)
        .to_string()
}

/// Split `text` on `separator` into at most `N` numeric parts
fn numeric_parts<const N: usize>(text: &str, separator: char) -> Option<Vec<u32>> {
    let parts = text
        .split(separator)
        .map(|part| part.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    (!parts.is_empty() && parts.len() <= N).then_some(parts)
}

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
pub fn parse_fhir_date(text: &str) -> Option<NaiveDate> {
    let parts = numeric_parts::<3>(text, '-')?;
    let year = i32::try_from(parts[0]).ok()?;
    let month = parts.get(1).copied().unwrap_or(1);
    let day = parts.get(2).copied().unwrap_or(1);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `HH`, `HH:MM` or `HH:MM:SS`
pub fn parse_fhir_time(text: &str) -> Option<NaiveTime> {
    let parts = numeric_parts::<3>(text, ':')?;
    let minute = parts.get(1).copied().unwrap_or(0);
    let second = parts.get(2).copied().unwrap_or(0);
    NaiveTime::from_hms_opt(parts[0], minute, second)
}

/// RFC 3339 date-times, or a partial date optionally followed by a partial
/// time (separated by `T` or a space). Values without an offset are UTC.
pub fn parse_fhir_date_time(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Some(date_time.with_timezone(&Utc));
    }

    let text = text.trim().trim_end_matches('Z');
    let (date, time) = match text.split_once(&['T', ' '][..]) {
        Some((date, time)) => (date, Some(time)),
        None => (text, None),
    };

    let date = parse_fhir_date(date)?;
    let time = match time {
        Some(time) => parse_fhir_time(time)?,
        None => NaiveTime::from_hms_opt(0, 0, 0)?,
    };
    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

/// Combine a FHIR date and an optional time (midnight by default).
pub fn make_fhir_date_time(date: &str, time: Option<&str>) -> Option<String> {
    let date = parse_fhir_date(date)?;
    let time = parse_fhir_time(time.unwrap_or("00:00:00"))?;
    Some(format_fhir_date_time(
        &Utc.from_utc_datetime(&NaiveDateTime::new(date, time)),
    ))
}

/// Date part of a date or date-time. Full-length dates are returned untouched.
pub fn extract_fhir_date(text: &str) -> Option<String> {
    if text.len() == FHIR_DATE_LEN {
        return Some(text.to_string());
    }
    parse_fhir_date_time(text).map(|date_time| format_fhir_date(&date_time.date_naive()))
}

/// Time part of a time or date-time. Full-length times are returned untouched.
pub fn extract_fhir_time(text: &str) -> Option<String> {
    if text.len() == FHIR_TIME_LEN {
        return Some(text.to_string());
    }
    parse_fhir_date_time(text).map(|date_time| format_fhir_time(&date_time.time()))
}

pub fn is_fhir_date_equal(left: &str, right: &str) -> bool {
    match (extract_fhir_date(left), extract_fhir_date(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}
