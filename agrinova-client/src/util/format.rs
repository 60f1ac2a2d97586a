use chrono::{DateTime, Local, Utc};

/// `17/10/2026, 14:05`, in local time.
pub fn format_date_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y, %H:%M").to_string()
}

pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y").to_string()
}

pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "-",
    }
}
