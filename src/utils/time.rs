use chrono::NaiveDate;

/// This is the standard way of converting a date to a string in daybalance.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn minutes_to_hours(minutes: u32) -> f64 {
    minutes as f64 / 60.
}

/// `2h 5m`, or `45m` for less than an hour.
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
