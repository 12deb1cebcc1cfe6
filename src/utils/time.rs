// src/utils/time.rs

/// Formats a duration in milliseconds as `HH:MM:SS.mmm`.
///
/// Hours are not wrapped at 24. Negative input is treated as zero.
pub fn format_millis(milliseconds: i64) -> String {
    let ms = milliseconds.max(0);
    let (secs, millis) = (ms / 1000, ms % 1000);
    let (hours, rem) = (secs / 3600, secs % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
