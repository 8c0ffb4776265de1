//! Parser for decoded FIT-style records: key/value maps coming either from a
//! binary FIT file or from the remote activity source.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use serde_json::Value;

use crate::error::ParseError;
use crate::types::activity::{ActivityHeader, ParsedActivity, RawSample};

pub type FitRecord = HashMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// Naive UTC.
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok().filter(|v: &f64| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(t) => Some(*t),
            FieldValue::Number(secs) if secs.is_finite() => {
                DateTime::from_timestamp(secs.trunc() as i64, 0).map(|t| t.naive_utc())
            }
            FieldValue::Text(s) => parse_naive_utc(s),
            _ => None,
        }
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Number(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }
}

/// Converts one JSON object into a record; nulls become absent keys.
pub fn record_from_json(object: &serde_json::Map<String, Value>) -> FitRecord {
    object
        .iter()
        .filter_map(|(key, value)| FieldValue::from_json(value).map(|v| (key.clone(), v)))
        .collect()
}

fn parse_naive_utc(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
}

/// Key names used by one of the two record conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNames {
    pub timestamp: &'static str,
    pub latitude: &'static str,
    pub longitude: &'static str,
    pub elevation: &'static str,
    pub distance: &'static str,
    pub heart_rate: &'static str,
    pub cadence: &'static str,
    pub speed: &'static str,
    pub power: &'static str,
    pub temperature: &'static str,
}

/// Which ecosystem produced the records, decided from the first record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Device files: `timestamp`, `position_lat`, `position_long`, `heart_rate`.
    Device,
    /// Platform exports: `time`, `lat`, `lng`, `heartrate`.
    Platform,
}

const DEVICE_FIELDS: FieldNames = FieldNames {
    timestamp: "timestamp",
    latitude: "position_lat",
    longitude: "position_long",
    elevation: "altitude",
    distance: "distance",
    heart_rate: "heart_rate",
    cadence: "cadence",
    speed: "speed",
    power: "power",
    temperature: "temperature",
};

const PLATFORM_FIELDS: FieldNames = FieldNames {
    timestamp: "time",
    latitude: "lat",
    longitude: "lng",
    heart_rate: "heartrate",
    ..DEVICE_FIELDS
};

impl RecordShape {
    pub fn detect(first: &FitRecord) -> Option<Self> {
        if first.contains_key(DEVICE_FIELDS.timestamp) {
            Some(RecordShape::Device)
        } else if first.contains_key(PLATFORM_FIELDS.timestamp) {
            Some(RecordShape::Platform)
        } else {
            None
        }
    }

    pub fn fields(&self) -> &'static FieldNames {
        match self {
            RecordShape::Device => &DEVICE_FIELDS,
            RecordShape::Platform => &PLATFORM_FIELDS,
        }
    }
}

const SEMICIRCLE_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Samples above this speed (in source units) count toward the cycling heuristic.
const CYCLING_SPEED: f64 = 20.0;
const CYCLING_FAST_SAMPLES: usize = 120;

pub fn parse_records(
    records: &[FitRecord],
    mut header: ActivityHeader,
    local: FixedOffset,
) -> Result<ParsedActivity, ParseError> {
    let first = records.first().ok_or(ParseError::EmptyFile)?;
    let shape = RecordShape::detect(first).ok_or(ParseError::MissingTimestamp(0))?;
    let names = shape.fields();
    // Records carry naive UTC; shift into the local zone.
    let offset = Duration::seconds(i64::from(local.local_minus_utc()));

    let mut samples = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let number = |key: &str| record.get(key).and_then(FieldValue::as_f64);
        let dtime = record
            .get(names.timestamp)
            .and_then(FieldValue::as_timestamp)
            .ok_or(ParseError::MissingTimestamp(idx))?
            + offset;

        samples.push(RawSample {
            dtime,
            lat: number(names.latitude),
            lon: number(names.longitude),
            elevation: number(names.elevation),
            distance: number(names.distance),
            heart_rate: number(names.heart_rate),
            cadence: number(names.cadence),
            speed: number(names.speed),
            power: number(names.power),
            temperature: number(names.temperature),
        });
    }

    if shape == RecordShape::Device {
        convert_semicircles(&mut samples);
        rescale_distance(&mut samples);
    }
    tracing::debug!(?shape, samples = samples.len(), "parsed fit records");

    if header.dtime.is_none() {
        header.dtime = samples.first().map(|s| s.dtime);
    }
    if header.sport.as_deref().map_or(true, |s| s.trim().is_empty()) {
        header.sport = Some(infer_sport(&samples).to_string());
    }

    Ok(ParsedActivity { header, samples })
}

/// Converts coordinates when any latitude lies outside the valid degree range.
pub fn convert_semicircles(samples: &mut [RawSample]) {
    let encoded = samples
        .iter()
        .filter_map(|s| s.lat)
        .any(|lat| !(-90.0..=90.0).contains(&lat));
    if !encoded {
        return;
    }
    for sample in samples.iter_mut() {
        sample.lat = sample.lat.map(|v| v * SEMICIRCLE_TO_DEGREES);
        sample.lon = sample.lon.map(|v| v * SEMICIRCLE_TO_DEGREES);
    }
}

/// Distances arrive in km, m or cm depending on the producer; the unit is
/// guessed from the largest value.
pub fn rescale_distance(samples: &mut [RawSample]) {
    let max = samples
        .iter()
        .filter_map(|s| s.distance)
        .map(f64::abs)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    let divisor = match max {
        None => return,
        Some(max) if max < 1_000.0 => return,
        Some(max) if max < 1_000_000.0 => 1_000.0,
        Some(_) => 100_000.0,
    };
    for sample in samples.iter_mut() {
        sample.distance = sample.distance.map(|d| d / divisor);
    }
}

/// Power data or sustained speed means a ride; anything else is a run.
pub fn infer_sport(samples: &[RawSample]) -> &'static str {
    let has_power = samples.iter().any(|s| s.power.is_some());
    let fast = samples
        .iter()
        .filter(|s| s.speed.map_or(false, |v| v > CYCLING_SPEED))
        .count();
    if has_power || fast > CYCLING_FAST_SAMPLES {
        "cycling"
    } else {
        "running"
    }
}
