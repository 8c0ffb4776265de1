use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::serde_fmt;

/// Athlete profile as served by the remote platform. Totals are in platform
/// units: centi-levels, meters and grams.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteProfile {
    pub achievement_level: f64,
    pub total_distance: f64,
    pub total_distance_climbed: f64,
    pub total_experience_points: u64,
    pub total_gold: u64,
    pub ftp: Option<f64>,
    pub weight: Option<f64>,
    pub run_achievement_level: f64,
    pub total_run_distance: f64,
    pub total_run_time_in_minutes: u64,
    pub total_run_experience_points: u64,
    pub total_run_calories: f64,
}

/// One row of the profile history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    #[serde(with = "serde_fmt::dtime")]
    pub dtime: NaiveDateTime,
    pub cycling_level: f64,
    /// km
    pub cycling_distance: f64,
    /// m
    pub cycling_elevation: f64,
    pub cycling_xp: u64,
    pub cycling_drops: u64,
    pub ftp: Option<f64>,
    /// kg
    pub weight: Option<f64>,
    pub running_level: f64,
    /// km
    pub running_distance: f64,
    pub running_minutes: u64,
    pub running_xp: u64,
    pub running_calories: f64,
}

impl RemoteProfile {
    pub fn snapshot(&self, dtime: NaiveDateTime) -> ProfileSnapshot {
        ProfileSnapshot {
            dtime,
            cycling_level: round_to(self.achievement_level / 100.0, 2),
            cycling_distance: round_to(self.total_distance / 1000.0, 3),
            cycling_elevation: self.total_distance_climbed,
            cycling_xp: self.total_experience_points,
            cycling_drops: self.total_gold,
            ftp: self.ftp,
            weight: self.weight.map(|grams| round_to(grams / 1000.0, 3)),
            running_level: round_to(self.run_achievement_level / 100.0, 2),
            running_distance: round_to(self.total_run_distance / 1000.0, 3),
            running_minutes: self.total_run_time_in_minutes,
            running_xp: self.total_run_experience_points,
            running_calories: self.total_run_calories,
        }
    }
}

impl ProfileSnapshot {
    /// Progress worth recording: more cycling xp or a higher cycling level,
    /// or any change in drops, ftp, weight or the running totals.
    pub fn changed_from(&self, latest: &ProfileSnapshot) -> bool {
        self.cycling_xp > latest.cycling_xp
            || self.cycling_level > latest.cycling_level
            || self.cycling_drops != latest.cycling_drops
            || self.ftp != latest.ftp
            || self.weight != latest.weight
            || self.running_level != latest.running_level
            || self.running_distance != latest.running_distance
            || self.running_xp != latest.running_xp
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
