//! Time formatting helpers.

/// Format a duration in seconds as a short human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// "in 5m 0s", or "now" once `target` has passed.
pub fn format_until(now_secs: u64, target_secs: u64) -> String {
    match target_secs.checked_sub(now_secs) {
        Some(0) | None => "now".to_string(),
        Some(remaining) => format!("in {}", format_duration(remaining)),
    }
}
