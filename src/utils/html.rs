// src/utils/html.rs

/// Sanitizes organizer-supplied descriptions with ammonia's whitelist.
///
/// Blank results are stored as NULL.
pub fn clean_description(input: Option<&str>) -> Option<String> {
    input
        .map(ammonia::clean)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
