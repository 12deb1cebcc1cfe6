// src/grading/timing.rs

use chrono::{DateTime, Utc};

/// Milliseconds from the first view to `now`, rounded to the nearest ms.
///
/// A first view later than `now` (clock skew) yields 0.
pub fn elapsed_ms(first_view: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = now - first_view;
    let millis = match delta.num_microseconds() {
        Some(micros) => (micros as f64 / 1000.0).round() as i64,
        None => delta.num_milliseconds(),
    };

    if millis < 0 {
        tracing::warn!(
            "First view {} is after scoring time {}, clamping elapsed time to 0",
            first_view,
            now
        );
        return 0;
    }
    millis
}
