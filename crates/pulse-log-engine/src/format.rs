use chrono::{DateTime, Datelike, Utc};

/// Format epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.ffffffZ` (UTC).
///
/// Output: `2023-11-14T22:13:20.123000Z` for `1700000000123`.
/// Returns `None` when the year falls outside 0000..=9999, which the
/// four-digit year cannot express.
pub fn format_timestamp_iso(ms: i64) -> Option<String> {
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(ms)?;
    if !(0..=9999).contains(&dt.year()) {
        return None;
    }
    Some(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}
