//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix epoch milliseconds, the form stored on score records
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}
