use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;
use crate::types::serde_fmt;

/// One instrument reading as emitted by a format parser.
///
/// `dtime` is already converted to naive local time. `distance` is in km for
/// TCX, absent for GPX, and of unknown unit for FIT until the record parser
/// has resolved it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSample {
    pub dtime: NaiveDateTime,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub elevation: Option<f64>,
    pub distance: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
    pub speed: Option<f64>,
    pub power: Option<f64>,
    pub temperature: Option<f64>,
}

/// Metadata known before normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivityHeader {
    pub dtime: Option<NaiveDateTime>,
    /// Source-specific, lowercased sport label (e.g. "biking", "virtualride").
    pub sport: Option<String>,
    pub title: String,
    pub src_file: String,
}

#[derive(Debug, Clone)]
pub struct ParsedActivity {
    pub header: ActivityHeader,
    pub samples: Vec<RawSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Cycling,
    Running,
    Other,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Cycling => "cycling",
            Sport::Running => "running",
            Sport::Other => "other",
        }
    }
}

impl FromStr for Sport {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cycling" => Ok(Sport::Cycling),
            "running" => Ok(Sport::Running),
            "other" => Ok(Sport::Other),
            _ => Err(ProcessingError::UnknownSport(s.to_string())),
        }
    }
}

/// Completed metadata: one row of the activity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetadata {
    #[serde(with = "serde_fmt::dtime")]
    pub dtime: NaiveDateTime,
    pub sport: Sport,
    pub title: String,
    pub src_file: String,
    /// km
    pub distance: Option<f64>,
    /// seconds, stored as H:MM:SS
    #[serde(with = "serde_fmt::hms")]
    pub duration: Option<u64>,
    #[serde(with = "serde_fmt::hms")]
    pub mov_duration: Option<u64>,
    /// Elevation gain in meters.
    pub elevation: Option<f64>,
    pub speed_avg: Option<f64>,
    pub speed_max: Option<f64>,
    pub hr_avg: Option<f64>,
    pub hr_max: Option<f64>,
    pub power_avg: Option<f64>,
    pub power_max: Option<f64>,
    pub cadence_avg: Option<f64>,
    pub cadence_max: Option<f64>,
    pub temp_avg: Option<f64>,
    pub temp_max: Option<f64>,
}

impl ActivityMetadata {
    /// Metadata with every summary field missing.
    pub fn empty(dtime: NaiveDateTime, sport: Sport, title: String, src_file: String) -> Self {
        Self {
            dtime,
            sport,
            title,
            src_file,
            distance: None,
            duration: None,
            mov_duration: None,
            elevation: None,
            speed_avg: None,
            speed_max: None,
            hr_avg: None,
            hr_max: None,
            power_avg: None,
            power_max: None,
            cadence_avg: None,
            cadence_max: None,
            temp_avg: None,
            temp_max: None,
        }
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.dtime + chrono::Duration::seconds(self.duration.unwrap_or(0) as i64)
    }
}

/// A normalized sample. Column order matches the stored sample files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedSample {
    #[serde(with = "serde_fmt::dtime")]
    pub dtime: NaiveDateTime,
    /// Seconds since the first sample.
    pub duration: f64,
    /// Moving seconds: the sample's index after stationary samples are removed.
    pub mov_duration: u64,
    /// Meters covered since the previous sample.
    pub movement: f64,
    #[serde(rename = "latt")]
    pub lat: Option<f64>,
    #[serde(rename = "long")]
    pub lon: Option<f64>,
    pub elevation: Option<f64>,
    /// km
    pub distance: Option<f64>,
    #[serde(rename = "hr")]
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
    pub speed: Option<f64>,
    pub power: Option<f64>,
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ProcessedActivity {
    pub metadata: ActivityMetadata,
    pub samples: Vec<CleanedSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Tcx,
    Gpx,
    Fit,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "tcx" => Some(FileFormat::Tcx),
            "gpx" => Some(FileFormat::Gpx),
            "fit" => Some(FileFormat::Fit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Tcx => "tcx",
            FileFormat::Gpx => "gpx",
            FileFormat::Fit => "fit",
        }
    }
}

/// Inclusive date bounds. An upper bound given at midnight covers that whole day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Self {
        let to = to.map(|t| {
            if t.time() == NaiveTime::MIN {
                t.date().and_hms_opt(23, 59, 59).unwrap_or(t)
            } else {
                t
            }
        });
        Self { from, to }
    }

    pub fn contains(&self, dtime: NaiveDateTime) -> bool {
        self.from.map_or(true, |from| dtime >= from) && self.to.map_or(true, |to| dtime <= to)
    }
}
