//! Marker parsing and export-window computation
//!
//! The marker is a calendar-day string (`YYYY-MM-DD`) naming the last day
//! that was fully delivered to the sink. All window math lives here so the
//! orchestrator stays a thin state machine.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Storage format for the marker
pub const MARKER_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored marker value. Returns `None` for anything that isn't a
/// plain `YYYY-MM-DD` date; callers treat that as a first run.
pub fn parse_marker(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), MARKER_FORMAT).ok()
}

/// Render a day in the marker storage format. Also used as the upload target
/// id, which is what makes re-uploads of the same day idempotent.
pub fn format_marker(day: NaiveDate) -> String {
    day.format(MARKER_FORMAT).to_string()
}

/// Days due for export, oldest first.
///
/// With a marker, the window starts the day after it; without one, only
/// yesterday is due. The current day is never included regardless of how far
/// behind the marker is, since its row accumulation is still in progress.
pub fn pending_days(marker: Option<NaiveDate>, today: NaiveDate) -> Vec<NaiveDate> {
    let yesterday = today - Duration::days(1);
    let start = match marker {
        Some(m) => m + Duration::days(1),
        None => yesterday,
    };

    let mut days = Vec::new();
    let mut day = start;
    while day <= yesterday {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

/// Epoch seconds for midnight UTC of the given day. This is the value
/// reported to the sink's cursor endpoint.
pub fn day_epoch(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Derive the initial marker from the registration response.
///
/// A zero or missing cursor means the sink has never received data from this
/// instance; exporting then starts at the first day of the current month.
/// A non-zero cursor is epoch seconds of the last delivered instant.
pub fn marker_from_epoch(epoch: i64, now: DateTime<Utc>) -> NaiveDate {
    if epoch <= 0 {
        return first_of_month(now.date_naive());
    }
    match Utc.timestamp_opt(epoch, 0) {
        chrono::LocalResult::Single(dt) => dt.date_naive(),
        _ => first_of_month(now.date_naive()),
    }
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day)
}
