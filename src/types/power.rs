use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::serde_fmt;

/// Window lengths (seconds) the power curve is evaluated at, 1s up to 12h.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationLadder {
    durations: Vec<u32>,
}

impl Default for DurationLadder {
    fn default() -> Self {
        let steps: [(u32, u32, u32); 7] = [
            (1, 30, 1),
            (30, 60, 5),
            (60, 120, 10),
            (120, 300, 30),
            (300, 1200, 60),
            (1200, 7200, 300),
            (7200, 12 * 3600 + 600, 600),
        ];
        let durations = steps
            .iter()
            .flat_map(|&(start, end, step)| (start..end).step_by(step as usize))
            .collect();
        Self { durations }
    }
}

impl DurationLadder {
    pub fn new(mut durations: Vec<u32>) -> Self {
        durations.retain(|d| *d > 0);
        durations.sort_unstable();
        durations.dedup();
        Self { durations }
    }

    pub fn durations(&self) -> &[u32] {
        &self.durations
    }
}

/// Best rolling-average power per window length for one activity.
///
/// Window lengths longer than the activity have no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurve {
    #[serde(with = "serde_fmt::dtime")]
    pub dtime: NaiveDateTime,
    pub watts: BTreeMap<u32, f64>,
}

impl PowerCurve {
    pub fn get(&self, duration: u32) -> Option<f64> {
        self.watts.get(&duration).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestPowerCurve {
    pub watts: BTreeMap<u32, f64>,
}

impl BestPowerCurve {
    pub fn from_curves<'a>(curves: impl IntoIterator<Item = &'a PowerCurve>) -> Self {
        let mut best = Self::default();
        for curve in curves {
            best.update(curve);
        }
        best
    }

    /// Raises every duration to `curve`'s value where it is higher.
    pub fn update(&mut self, curve: &PowerCurve) {
        for (&duration, &watts) in &curve.watts {
            self.watts
                .entry(duration)
                .and_modify(|best| *best = best.max(watts))
                .or_insert(watts);
        }
    }

    pub fn get(&self, duration: u32) -> Option<f64> {
        self.watts.get(&duration).copied()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PowerCurveReport {
    pub activities: Vec<PowerCurve>,
    pub best: BestPowerCurve,
}
