//! Flat-file representations of timestamps and durations.

use chrono::NaiveDateTime;

const DTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn format_dtime(dtime: &NaiveDateTime) -> String {
    dtime.format(DTIME_FORMAT).to_string()
}

/// Accepts `2026-01-01 12:00:00`, `2026-01-01T12:00:00` and a bare `2026-01-01`.
pub fn parse_dtime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DTIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn format_hms(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Parses `H:MM:SS`, optionally prefixed by `N days `.
pub fn parse_hms(s: &str) -> Option<u64> {
    let s = s.trim();
    let (days, clock) = match s.split_once(" days ") {
        Some((days, clock)) => (days.trim().parse::<u64>().ok()?, clock),
        None => (0, s),
    };
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(days * 86_400 + hours * 3600 + minutes * 60 + seconds.floor() as u64)
}

pub mod dtime {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_dtime(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_dtime(&raw).ok_or_else(|| D::Error::custom(format!("invalid dtime: {raw}")))
    }
}

pub mod hms {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(seconds) => serializer.serialize_str(&super::format_hms(*seconds)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_hms(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid duration: {raw}"))),
        }
    }
}
