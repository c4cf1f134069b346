//! Editable date-time text for entry start/end fields.
//!
//! Instants are rendered as `MM/DD/YYYY h:mm AM|PM` in the instant's own time
//! zone. Parsing is lenient about whitespace and marker case but never
//! partially applies a value: [`parse`] either applies every field or returns
//! the fallback untouched, so an edit field can be re-parsed on every
//! keystroke without interrupting the user.

use std::fmt;

use chrono::{DateTime, LocalResult, NaiveDate, Offset, TimeZone, Timelike};
use thiserror::Error;

/// `chrono` format string of the edit representation.
pub const EDIT_FORMAT: &str = "%m/%d/%Y %-I:%M %p";

/// Why a piece of edit text is not a usable date-time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditTextError {
    #[error("expected a space between date and time")]
    MissingSeparator,
    #[error("expected MM/DD/YYYY, got {0:?}")]
    MalformedDate(String),
    #[error("expected h:mm, got {0:?}")]
    MalformedTime(String),
    #[error("{field} is not a number: {value:?}")]
    NotNumeric { field: &'static str, value: String },
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u32 },
    #[error("no such date: {month:02}/{day:02}/{year}")]
    NoSuchDate { year: i32, month: u32, day: u32 },
}

/// Calendar fields read from edit text, with the hour in 24-hour form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// Renders an instant in the edit representation.
pub fn format<Tz>(instant: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    instant.format(EDIT_FORMAT).to_string()
}

/// Parses edit text onto a copy of `fallback`.
///
/// Fields not present in the text (seconds and below, the time zone) are
/// kept from `fallback`. Any malformed or out-of-range input yields
/// `fallback` unchanged.
pub fn parse<Tz: TimeZone>(text: &str, fallback: &DateTime<Tz>) -> DateTime<Tz> {
    validate(text)
        .ok()
        .and_then(|fields| apply(fields, fallback))
        .unwrap_or_else(|| fallback.clone())
}

/// Whether `text` would be accepted by [`parse`] (ignoring time zone gaps).
pub fn is_well_formed(text: &str) -> bool {
    validate(text).is_ok()
}

/// Reads the calendar fields of edit text, reporting the first problem found.
pub fn validate(text: &str) -> Result<EditFields, EditTextError> {
    let (date, time) = text
        .trim()
        .split_once(' ')
        .ok_or(EditTextError::MissingSeparator)?;

    let date_parts: Vec<&str> = date.split('/').collect();
    let [month, day, year] = date_parts[..] else {
        return Err(EditTextError::MalformedDate(date.to_string()));
    };
    let month = in_range("month", number("month", month)?, 1..=12)?;
    let day = in_range("day", number("day", day)?, 1..=31)?;
    // Four digits at most, so the value formats back as `YYYY` and stays
    // within the RFC 3339 year range used for storage.
    let year = in_range("year", number("year", year)?, 0..=9999)?;
    let year = i32::try_from(year).map_err(|_| EditTextError::OutOfRange {
        field: "year",
        value: year,
    })?;
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return Err(EditTextError::NoSuchDate { year, month, day });
    }

    let (clock, meridiem) = strip_meridiem(time.trim());
    let time_parts: Vec<&str> = clock.trim().split(':').collect();
    let [hour, minute] = time_parts[..] else {
        return Err(EditTextError::MalformedTime(time.to_string()));
    };
    let hour = number("hour", hour)?;
    let hour = match meridiem {
        Some(meridiem) => to_24_hour(in_range("hour", hour, 1..=12)?, meridiem),
        None => in_range("hour", hour, 0..=23)?,
    };
    let minute = in_range("minute", number("minute", minute)?, 0..=59)?;

    Ok(EditFields {
        year,
        month,
        day,
        hour,
        minute,
    })
}

fn apply<Tz: TimeZone>(fields: EditFields, fallback: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let local = NaiveDate::from_ymd_opt(fields.year, fields.month, fields.day)?.and_hms_nano_opt(
        fields.hour,
        fields.minute,
        fallback.second(),
        fallback.nanosecond(),
    )?;
    match fallback.timezone().from_local_datetime(&local) {
        LocalResult::Single(instant) => Some(instant),
        // Repeated wall-clock hour: stay on the fallback's side of the transition.
        LocalResult::Ambiguous(earliest, latest) => {
            if latest.offset().fix() == fallback.offset().fix() {
                Some(latest)
            } else {
                Some(earliest)
            }
        }
        LocalResult::None => None,
    }
}

fn strip_meridiem(time: &str) -> (&str, Option<Meridiem>) {
    let Some(split) = time.len().checked_sub(2) else {
        return (time, None);
    };
    match time.get(split..) {
        Some(marker) if marker.eq_ignore_ascii_case("AM") => (&time[..split], Some(Meridiem::Am)),
        Some(marker) if marker.eq_ignore_ascii_case("PM") => (&time[..split], Some(Meridiem::Pm)),
        _ => (time, None),
    }
}

const fn to_24_hour(hour: u32, meridiem: Meridiem) -> u32 {
    match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Pm, 12) | (Meridiem::Am, _) => hour,
        (Meridiem::Pm, _) => hour + 12,
    }
}

fn number(field: &'static str, raw: &str) -> Result<u32, EditTextError> {
    let raw = raw.trim();
    let not_numeric = || EditTextError::NotNumeric {
        field,
        value: raw.to_string(),
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_numeric());
    }
    raw.parse().map_err(|_| not_numeric())
}

fn in_range(
    field: &'static str,
    value: u32,
    range: std::ops::RangeInclusive<u32>,
) -> Result<u32, EditTextError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(EditTextError::OutOfRange { field, value })
    }
}
