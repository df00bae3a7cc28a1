use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDate};

/// Milliseconds since UNIX epoch.
pub type EpochMs = i64;

/// Returns current unix epoch milliseconds.
pub fn now_ms() -> EpochMs {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as i64
}

/// Today's date in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
