use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_file_size: usize,
    /// Profile directory holding `activities.csv` and the per-activity sample files.
    pub data_dir: PathBuf,
    /// Offset of the local zone every parser converts timestamps into.
    pub utc_offset_hours: i32,
    pub min_moving_kph: f64,
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            max_file_size: 25 * 1024 * 1024,
            data_dir: PathBuf::from("my-training-data"),
            utc_offset_hours: 7,
            min_moving_kph: 3.0,
            remote_url: None,
            remote_token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let max_file_size_mb: usize = std::env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25);

        let data_dir = std::env::var("RIDELOG_DATA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let utc_offset_hours = std::env::var("RIDELOG_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|h: &i32| (-23..=23).contains(h))
            .unwrap_or(defaults.utc_offset_hours);

        let min_moving_kph = std::env::var("RIDELOG_MIN_MOVING_KPH")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v: &f64| v.is_finite() && *v >= 0.0)
            .unwrap_or(defaults.min_moving_kph);

        let remote_url = non_empty_env("RIDELOG_REMOTE_URL");
        let remote_token = non_empty_env("RIDELOG_REMOTE_TOKEN");

        Self {
            port,
            max_file_size: max_file_size_mb * 1024 * 1024,
            data_dir,
            utc_offset_hours,
            min_moving_kph,
            remote_url,
            remote_token,
        }
    }

    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
