//! Read-only renderings of timer values.

use chrono::{DateTime, Utc};

/// Label shown for an entry that has not been stopped yet.
pub const IN_PROGRESS: &str = "In progress";

/// Formats elapsed seconds as `HH:MM:SS`. Hours grow past two digits.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats an entry's duration as `XhYm`, or [`IN_PROGRESS`] for an open entry.
///
/// Partial minutes are dropped. An end before the start renders as `0h0m`.
pub fn format_duration(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> String {
    let Some(end) = end else {
        return IN_PROGRESS.to_string();
    };
    let minutes = (end - start).num_minutes().max(0);
    format!("{}h{}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    #[test]
    fn elapsed_is_zero_padded() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(90), "00:01:30");
        assert_eq!(format_elapsed(3 * 3600 + 7 * 60 + 5), "03:07:05");
        assert_eq!(format_elapsed(100 * 3600), "100:00:00");
    }

    #[test]
    fn duration_uses_whole_minutes() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(format_duration(start, None), "In progress");
        assert_eq!(
            format_duration(start, Some(start + Duration::seconds(59))),
            "0h0m"
        );
        assert_eq!(
            format_duration(start, Some(start + Duration::minutes(135) + Duration::seconds(40))),
            "2h15m"
        );
        assert_eq!(
            format_duration(start, Some(start - Duration::minutes(5))),
            "0h0m"
        );
    }
}
