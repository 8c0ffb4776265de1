//! Turns parser output into cleaned samples and a completed summary.
//!
//! The steps run in a fixed order: clamp, reconcile movement and distance,
//! elapsed time, speed recomputation, smoothing, stationary removal, moving
//! time, sport canonicalization, summary, rounding. Only an undeterminable
//! distance source and an unknown sport label abort processing; every other
//! anomaly becomes a missing value.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::ProcessingError;
use crate::pipeline::geo::measure_distance;
use crate::types::activity::{
    ActivityMetadata, CleanedSample, ParsedActivity, ProcessedActivity, RawSample, Sport,
};

/// Physically plausible ceilings. Values above are capped, never dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub elevation: f64,
    pub heart_rate: f64,
    pub power: f64,
    pub cadence: f64,
    /// km/h
    pub speed: f64,
    pub temperature: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            elevation: 9000.0,
            heart_rate: 250.0,
            power: 2500.0,
            cadence: 210.0,
            speed: 100.0,
            temperature: 55.0,
        }
    }
}

impl Limits {
    pub fn clamp(&self, sample: RawSample) -> RawSample {
        let cap = |value: Option<f64>, ceiling: f64| value.map(|v| v.min(ceiling));
        RawSample {
            elevation: cap(sample.elevation, self.elevation),
            heart_rate: cap(sample.heart_rate, self.heart_rate),
            power: cap(sample.power, self.power),
            cadence: cap(sample.cadence, self.cadence),
            speed: cap(sample.speed, self.speed),
            temperature: cap(sample.temperature, self.temperature),
            ..sample
        }
    }

    /// Largest plausible movement between two samples, in meters.
    pub fn max_movement(&self) -> f64 {
        self.speed * 1000.0 / 3600.0
    }
}

/// Maps source-specific sport labels onto the canonical sports.
#[derive(Debug, Clone)]
pub struct SportTable {
    labels: HashMap<String, Sport>,
}

impl Default for SportTable {
    fn default() -> Self {
        let labels = [
            ("biking", Sport::Cycling),
            ("cycling", Sport::Cycling),
            ("cycling_transportation", Sport::Cycling),
            ("cycling_sport", Sport::Cycling),
            ("ride", Sport::Cycling),
            ("virtualride", Sport::Cycling),
            ("virtualrun", Sport::Running),
            ("run", Sport::Running),
            ("running", Sport::Running),
            ("other", Sport::Other),
        ]
        .into_iter()
        .map(|(label, sport)| (label.to_string(), sport))
        .collect();
        Self { labels }
    }
}

impl SportTable {
    pub fn with_label(mut self, label: &str, sport: Sport) -> Self {
        self.labels.insert(label.to_lowercase(), sport);
        self
    }

    pub fn canonical(&self, label: &str) -> Result<Sport, ProcessingError> {
        self.labels
            .get(label.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| ProcessingError::UnknownSport(label.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub limits: Limits,
    /// Samples moving slower than this are treated as pauses.
    pub min_moving_kph: f64,
    pub sports: SportTable,
    pub speed_window: usize,
    pub sensor_window: usize,
    pub elevation_window: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            min_moving_kph: 3.0,
            sports: SportTable::default(),
            speed_window: 3,
            sensor_window: 2,
            elevation_window: 6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn process(&self, parsed: ParsedActivity) -> Result<ProcessedActivity, ProcessingError> {
        let ParsedActivity { header, samples } = parsed;
        let start = samples.first().ok_or(ProcessingError::EmptyActivity)?.dtime;
        let config = &self.config;

        let samples: Vec<RawSample> = samples
            .into_iter()
            .map(|s| config.limits.clamp(s))
            .collect();

        let (movement, distance) = self.reconcile_movement(&samples)?;
        let duration: Vec<f64> = samples
            .iter()
            .map(|s| seconds_between(start, s.dtime))
            .collect();

        let speed = recompute_speed(&movement, &duration, config.limits.speed);
        let speed = rolling_mean(&speed, config.speed_window);
        let heart_rate = rolling_mean(&column(&samples, |s| s.heart_rate), config.sensor_window);
        let cadence = rolling_mean(&column(&samples, |s| s.cadence), config.sensor_window);
        let power = rolling_mean(&column(&samples, |s| s.power), config.sensor_window);
        let temperature =
            rolling_mean(&column(&samples, |s| s.temperature), config.sensor_window);

        let min_movement = config.min_moving_kph * 1000.0 / 3600.0;
        let mut cleaned: Vec<CleanedSample> = Vec::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            let movement = match movement[i] {
                Some(m) if m >= min_movement => m,
                _ => continue,
            };
            cleaned.push(CleanedSample {
                dtime: sample.dtime,
                duration: duration[i],
                mov_duration: cleaned.len() as u64,
                movement,
                lat: sample.lat,
                lon: sample.lon,
                elevation: sample.elevation,
                distance: distance[i],
                heart_rate: heart_rate[i],
                cadence: cadence[i],
                speed: speed[i],
                power: power[i],
                temperature: temperature[i],
            });
        }
        tracing::debug!(
            "{}: kept {} of {} samples as moving",
            header.src_file,
            cleaned.len(),
            samples.len()
        );

        let sport = config
            .sports
            .canonical(header.sport.as_deref().unwrap_or_default())?;

        let mut metadata = ActivityMetadata::empty(
            header.dtime.unwrap_or(start),
            sport,
            header.title,
            header.src_file,
        );
        self.summarize(&cleaned, &mut metadata);

        for sample in &mut cleaned {
            sample.elevation = sample.elevation.map(|v| round_to(v, 2));
            sample.distance = sample.distance.map(|v| round_to(v, 3));
            sample.speed = sample.speed.map(|v| round_to(v, 2));
        }

        Ok(ProcessedActivity {
            metadata,
            samples: cleaned,
        })
    }

    /// Returns per-sample movement (m) and cumulative distance (km).
    ///
    /// A distance on the first sample makes the distance column authoritative;
    /// otherwise movement comes from the coordinates.
    fn reconcile_movement(
        &self,
        samples: &[RawSample],
    ) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>), ProcessingError> {
        let first = samples.first().ok_or(ProcessingError::EmptyActivity)?;

        let (movement, distance) = match first.distance {
            Some(first_distance) => {
                let distance: Vec<Option<f64>> = samples.iter().map(|s| s.distance).collect();
                let mut movement = Vec::with_capacity(samples.len());
                movement.push(Some(first_distance * 1000.0));
                for pair in distance.windows(2) {
                    movement.push(match (pair[0], pair[1]) {
                        (Some(prev), Some(cur)) => Some(cur * 1000.0 - prev * 1000.0),
                        _ => None,
                    });
                }
                (movement, distance)
            }
            None => {
                if first.lat.is_none() {
                    return Err(ProcessingError::MissingDistanceSource);
                }
                let mut movement = Vec::with_capacity(samples.len());
                let mut distance = Vec::with_capacity(samples.len());
                let mut total = 0.0;
                movement.push(Some(0.0));
                distance.push(Some(0.0));
                for pair in samples.windows(2) {
                    let (prev, cur) = (&pair[0], &pair[1]);
                    let meters = measure_distance(prev.lat, prev.lon, cur.lat, cur.lon)
                        .unwrap_or(0.0);
                    total += meters;
                    movement.push(Some(meters));
                    distance.push(Some(total / 1000.0));
                }
                (movement, distance)
            }
        };

        let max_movement = self.config.limits.max_movement();
        let movement = movement
            .into_iter()
            .map(|m| m.map(|v| round_to(v, 3).min(max_movement)))
            .collect();
        Ok((movement, distance))
    }

    fn summarize(&self, samples: &[CleanedSample], metadata: &mut ActivityMetadata) {
        let Some(last) = samples.last() else {
            return;
        };

        let distance = last.distance.map(|d| round_to(d, 3));
        let mov_duration = last.mov_duration;
        metadata.distance = distance;
        metadata.duration = Some(last.duration.max(0.0).round() as u64);
        metadata.mov_duration = Some(mov_duration);
        metadata.elevation = Some(round_to(
            elevation_gain(
                &samples.iter().map(|s| s.elevation).collect::<Vec<_>>(),
                self.config.elevation_window,
            ),
            1,
        ));
        metadata.speed_avg = match distance {
            Some(km) if mov_duration > 0 => Some(round_to(km / (mov_duration as f64 / 3600.0), 1)),
            _ => None,
        };
        metadata.speed_max = max(samples.iter().map(|s| s.speed)).map(|v| round_to(v, 1));
        metadata.hr_avg = mean(samples.iter().map(|s| s.heart_rate)).map(|v| round_to(v, 2));
        metadata.hr_max = max(samples.iter().map(|s| s.heart_rate));
        metadata.power_avg = mean(samples.iter().map(|s| s.power)).map(|v| round_to(v, 2));
        metadata.power_max = max(samples.iter().map(|s| s.power));
        // Coasting (zero cadence) is left out of the average but not the max.
        metadata.cadence_avg = mean(samples.iter().map(|s| s.cadence.filter(|c| *c > 0.0)))
            .map(|v| round_to(v, 2));
        metadata.cadence_max = max(samples.iter().map(|s| s.cadence)).map(f64::ceil);
        metadata.temp_avg = mean(samples.iter().map(|s| s.temperature)).map(|v| round_to(v, 1));
        metadata.temp_max = max(samples.iter().map(|s| s.temperature));
    }
}

/// Sum of the positive steps of the trailing `window`-sample mean of `elevation`.
///
/// A smoothed value needs `window` present samples, so short gaps in the
/// series break the sum rather than inventing climbs.
pub fn elevation_gain(elevation: &[Option<f64>], window: usize) -> f64 {
    let window = window.max(1);
    let smoothed: Vec<Option<f64>> = (0..elevation.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &elevation[i + 1 - window..=i];
            let sum = slice.iter().copied().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect();

    smoothed
        .windows(2)
        .filter_map(|pair| match (pair[0], pair[1]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        })
        .filter(|climb| *climb > 0.0)
        .sum()
}

/// Trailing mean over the last `window` values, ignoring missing ones.
/// A window without any present value stays missing.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let lo = (i + 1).saturating_sub(window);
            mean(values[lo..=i].iter().copied())
        })
        .collect()
}

fn recompute_speed(movement: &[Option<f64>], duration: &[f64], ceiling: f64) -> Vec<Option<f64>> {
    movement
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let tick = if i == 0 { 1.0 } else { duration[i] - duration[i - 1] };
            m.map(|meters| meters * 3600.0 / 1000.0 / tick)
                .filter(|kph| kph.is_finite())
                .map(|kph| kph.min(ceiling))
        })
        .collect()
}

fn column(samples: &[RawSample], field: impl Fn(&RawSample) -> Option<f64>) -> Vec<Option<f64>> {
    samples.iter().map(field).collect()
}

fn seconds_between(start: NaiveDateTime, dtime: NaiveDateTime) -> f64 {
    (dtime - start).num_milliseconds() as f64 / 1000.0
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn max(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    })
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
