use chrono::{DateTime, Utc};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;
use std::time::Duration;

/// The exchange's local timezone.
pub const EXCHANGE_TZ: Tz = Kolkata;

pub fn to_exchange_time(instant: DateTime<Utc>) -> DateTime<Tz> {
    instant.with_timezone(&EXCHANGE_TZ)
}

/// US-locale rendering of exchange-local time, e.g. `10/14/2026, 9:05:00 AM`.
pub fn format_exchange_timestamp(instant: DateTime<Utc>) -> String {
    to_exchange_time(instant)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}
