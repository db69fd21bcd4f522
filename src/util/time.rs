//! Time formatting utilities.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Describe how long ago `target` was ("just now", "5 minutes ago").
#[must_use]
pub fn format_relative_time(target: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(target);

    if elapsed.num_seconds().abs() < 60 {
        return "just now".to_string();
    }

    let suffix = if elapsed.num_seconds() > 0 {
        "ago"
    } else {
        "from now"
    };
    let (count, unit) = if elapsed.num_days().abs() > 0 {
        (elapsed.num_days().abs(), "day")
    } else if elapsed.num_hours().abs() > 0 {
        (elapsed.num_hours().abs(), "hour")
    } else {
        (elapsed.num_minutes().abs(), "minute")
    };

    format!("{count} {unit}{} {suffix}", plural(count))
}

/// Short form of a refresh interval ("30s", "5m", "1h 30m").
#[must_use]
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

const fn plural(count: i64) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn relative_time_past() {
        let target = Utc::now() - ChronoDuration::minutes(5);
        assert_eq!(format_relative_time(target), "5 minutes ago");

        let target = Utc::now() - ChronoDuration::hours(1) - ChronoDuration::minutes(5);
        assert_eq!(format_relative_time(target), "1 hour ago");
    }

    #[test]
    fn relative_time_recent() {
        assert_eq!(format_relative_time(Utc::now()), "just now");
    }

    #[test]
    fn intervals() {
        assert_eq!(format_interval(Duration::from_secs(45)), "45s");
        assert_eq!(format_interval(Duration::from_secs(60)), "1m");
        assert_eq!(format_interval(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_interval(Duration::from_secs(7200)), "2h");
        assert_eq!(format_interval(Duration::from_secs(5400)), "1h 30m");
    }
}
