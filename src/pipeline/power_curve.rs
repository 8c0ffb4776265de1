//! Mean-maximal power per window length.
//!
//! Samples are assumed to be ~1 Hz: a window of N seconds is N consecutive
//! samples. No resampling happens, so gaps in the recording stretch a window
//! over more wall-clock time than its nominal length.

use crate::error::StoreError;
use crate::store::ActivityStore;
use crate::types::activity::{CleanedSample, DateRange};
use crate::types::power::{BestPowerCurve, DurationLadder, PowerCurve, PowerCurveReport};

#[derive(Debug, Clone)]
pub struct PowerCurveCalculator {
    pub ladder: DurationLadder,
    /// Samples outside `[min_power, max_power]` are dropped before windowing.
    pub min_power: f64,
    pub max_power: f64,
}

impl Default for PowerCurveCalculator {
    fn default() -> Self {
        Self {
            ladder: DurationLadder::default(),
            min_power: 20.0,
            max_power: 3000.0,
        }
    }
}

impl PowerCurveCalculator {
    /// Best trailing-window average for every ladder duration that fits in
    /// the activity. `None` when no sample has usable power.
    pub fn curve(&self, samples: &[CleanedSample]) -> Option<PowerCurve> {
        let dtime = samples.first()?.dtime;
        let powers: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.power)
            .filter(|p| (self.min_power..=self.max_power).contains(p))
            .collect();
        if powers.is_empty() {
            return None;
        }

        let mut prefix = Vec::with_capacity(powers.len() + 1);
        prefix.push(0.0);
        for p in &powers {
            prefix.push(prefix[prefix.len() - 1] + p);
        }

        let watts = self
            .ladder
            .durations()
            .iter()
            .filter_map(|&duration| {
                let window = duration as usize;
                if window > powers.len() {
                    return None;
                }
                let best = (window..=powers.len())
                    .map(|end| prefix[end] - prefix[end - window])
                    .fold(f64::NEG_INFINITY, f64::max);
                Some((duration, round_1(best / window as f64)))
            })
            .collect();

        Some(PowerCurve { dtime, watts })
    }

    /// Curves of every stored activity inside `range`, plus their per-duration
    /// maximum. With `max_hr`, only samples at or below that heart rate count.
    pub fn query(
        &self,
        store: &ActivityStore,
        range: DateRange,
        max_hr: Option<f64>,
    ) -> Result<PowerCurveReport, StoreError> {
        let mut report = PowerCurveReport::default();

        for (dtime, path) in store.sample_files(range)? {
            let samples: Vec<CleanedSample> = store
                .read_samples(&path)?
                .into_iter()
                .filter(|s| s.power.is_some() && s.heart_rate.is_some())
                .filter(|s| max_hr.map_or(true, |limit| s.heart_rate.map_or(false, |hr| hr <= limit)))
                .collect();

            match self.curve(&samples) {
                Some(mut curve) => {
                    curve.dtime = dtime;
                    report.best.update(&curve);
                    report.activities.push(curve);
                }
                None => tracing::debug!("no usable power in {}", path.display()),
            }
        }

        Ok(report)
    }

    pub fn best(&self, curves: &[PowerCurve]) -> BestPowerCurve {
        BestPowerCurve::from_curves(curves)
    }
}

fn round_1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
