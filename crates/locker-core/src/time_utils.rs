use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Calendar date of `now` on the UTC clock; daily counters roll over on it.
pub fn utc_today(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Renders time left until a lock deadline as `"<h>h <m>m"`, or `"soon"` once
/// the deadline has passed.
pub fn format_remaining(remaining: TimeDelta) -> String {
    let total_seconds = remaining.num_seconds();
    if total_seconds <= 0 {
        return "soon".to_string();
    }
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    format!("{hours}h {minutes}m")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_format_remaining_splits_hours_and_minutes() {
        assert_eq!(format_remaining(TimeDelta::seconds(23 * 3_600 + 59 * 60 + 30)), "23h 59m");
        assert_eq!(format_remaining(TimeDelta::seconds(59)), "0h 0m");
    }

    #[test]
    fn regression_format_remaining_reports_soon_for_elapsed_deadlines() {
        assert_eq!(format_remaining(TimeDelta::zero()), "soon");
        assert_eq!(format_remaining(TimeDelta::seconds(-90)), "soon");
    }
}
