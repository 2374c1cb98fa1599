use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Truncate a timestamp down to a multiple of `step_seconds` since the epoch (UTC).
pub fn truncate_to(ts: DateTime<Utc>, step_seconds: i64) -> DateTime<Utc> {
    let excess = ts.timestamp().rem_euclid(step_seconds);
    ts - TimeDelta::seconds(excess) - TimeDelta::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}

/// Lenient ISO-8601 parsing for caller-supplied bounds.
///
/// Accepts a trailing `Z`, numeric offsets (with or without a colon),
/// fractional seconds, a space instead of `T`, and date-only strings. Values
/// without an offset are taken as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty datetime".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN).and_utc());
    }

    Err(format!("cannot parse datetime: {}", input))
}

/// Human-readable duration, e.g. `45 seconds`, `12 minutes`, `1 hour 5 min`.
pub fn format_duration(seconds: i64) -> String {
    fn plural(n: i64) -> &'static str {
        if n == 1 { "" } else { "s" }
    }

    if seconds < 60 {
        format!("{} seconds", seconds)
    } else if seconds < SECONDS_PER_HOUR {
        let minutes = seconds / 60;
        format!("{} minute{}", minutes, plural(minutes))
    } else {
        let hours = seconds / SECONDS_PER_HOUR;
        let minutes = (seconds % SECONDS_PER_HOUR) / 60;
        if minutes > 0 {
            format!("{} hour{} {} min", hours, plural(hours), minutes)
        } else {
            format!("{} hour{}", hours, plural(hours))
        }
    }
}
