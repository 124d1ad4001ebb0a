use time::OffsetDateTime;

/// Human phrasing for a timestamp relative to now. Future estimates read as
/// time remaining, past ones as time elapsed. `None` renders as an empty
/// string so callers can show it unconditionally.
pub fn format_duration_from_now(end_estimate: Option<i64>, now: OffsetDateTime) -> String {
    let Some(end) = end_estimate else {
        return String::new();
    };
    // Estimates come off the wire, so keep the arithmetic total even for
    // garbage timestamps.
    let delta = end.saturating_sub(now.unix_timestamp());
    if delta >= 0 {
        format!("{} remaining", coarse_duration(delta))
    } else {
        format!("{} ago", coarse_duration(delta.saturating_abs()))
    }
}

fn coarse_duration(secs: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    if secs < 45 {
        "less than a minute".to_string()
    } else if secs < 90 {
        "about a minute".to_string()
    } else if secs < 45 * MINUTE {
        format!("{} minutes", round_div(secs, MINUTE))
    } else if secs < 90 * MINUTE {
        "about an hour".to_string()
    } else if secs < 22 * HOUR {
        format!("{} hours", round_div(secs, HOUR))
    } else if secs < 36 * HOUR {
        "about a day".to_string()
    } else {
        format!("{} days", round_div(secs, DAY))
    }
}

fn round_div(value: i64, unit: i64) -> i64 {
    value.saturating_add(unit / 2) / unit
}
