//! Timestamp conversions for archive headers.

use std::time::Duration;
use std::time::SystemTime;

use chrono::NaiveDate;

/// Seconds since the Unix epoch.
#[must_use]
pub fn from_unix_seconds(secs: i64) -> Option<SystemTime> {
    if secs >= 0 {
        SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(secs.unsigned_abs()))
    } else {
        SystemTime::UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    }
}

/// Calendar date and time, interpreted as UTC.
///
/// Zip and rar store local time without a zone; treating it as UTC keeps
/// extraction independent of the host time zone.
#[must_use]
pub fn from_civil(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<SystemTime> {
    let stamp = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, second)?
        .and_utc()
        .timestamp();
    from_unix_seconds(stamp)
}

/// MS-DOS packed date (high word) and time (low word).
#[must_use]
pub fn from_dos(packed: u32) -> Option<SystemTime> {
    let date = packed >> 16;
    let time = packed & 0xffff;
    from_civil(
        1980 + ((date >> 9) & 0x7f) as i32,
        (date >> 5) & 0x0f,
        date & 0x1f,
        time >> 11,
        (time >> 5) & 0x3f,
        (time & 0x1f) * 2,
    )
}
