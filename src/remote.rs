//! Client for the remote fitness platform.
//!
//! The platform is an opaque JSON source: a paged activity listing and, per
//! activity, a list of records in the platform FIT shape (`time`, `lat`,
//! `lng`, `heartrate`, ...).

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{ActivityError, RemoteError};
use crate::import::ImportFailure;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::parse::records::{parse_records, record_from_json, FitRecord};
use crate::store::{ActivityStore, SaveOutcome};
use crate::types::activity::{ActivityHeader, DateRange, ProcessedActivity};
use crate::types::profile::RemoteProfile;
use crate::types::serde_fmt;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sport: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub distance_in_meters: Option<f64>,
    pub total_elevation: Option<f64>,
    pub avg_watts: Option<f64>,
    pub calories: Option<f64>,
}

/// Listing row with the platform's own totals.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteSummary {
    pub id: u64,
    #[serde(with = "serde_fmt::dtime")]
    pub dtime: NaiveDateTime,
    pub sport: String,
    pub title: String,
    #[serde(with = "serde_fmt::hms")]
    pub duration: Option<u64>,
    pub distance: Option<f64>,
    pub elevation: Option<f64>,
    pub power_avg: Option<f64>,
    pub calories: Option<f64>,
}

impl RemoteActivity {
    pub fn src_file(&self) -> String {
        format!("{}.remote", self.id)
    }

    /// Start time in the local zone, truncated to whole seconds.
    pub fn local_start(&self, local: FixedOffset) -> NaiveDateTime {
        let start = self.start_date.with_timezone(&local).naive_local();
        start.with_nanosecond(0).unwrap_or(start)
    }

    pub fn header(&self, local: FixedOffset) -> ActivityHeader {
        ActivityHeader {
            dtime: Some(self.local_start(local)),
            sport: Some(self.sport.to_lowercase()),
            title: self.name.clone(),
            src_file: self.src_file(),
        }
    }

    pub fn summary(&self, local: FixedOffset) -> RemoteSummary {
        RemoteSummary {
            id: self.id,
            dtime: self.local_start(local),
            sport: self.sport.to_lowercase(),
            title: self.name.clone(),
            duration: self
                .end_date
                .map(|end| (end - self.start_date).num_seconds().max(0) as u64),
            distance: self.distance_in_meters.map(|m| round_1(m / 1000.0)),
            elevation: self.total_elevation.map(round_1),
            power_avg: self.avg_watts.map(round_1),
            calories: self.calories.map(round_1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .remote_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.remote_token.clone()))
    }

    pub async fn list_activities(
        &self,
        start: usize,
        limit: usize,
    ) -> Result<Vec<RemoteActivity>, RemoteError> {
        let url = format!(
            "{}/activities?start={}&limit={}",
            self.base_url, start, limit
        );
        let activities: Vec<RemoteActivity> = self.get_json(&url).await?;
        tracing::info!("Fetched {} remote activities from offset {}", activities.len(), start);
        Ok(activities)
    }

    pub async fn activity_records(&self, id: u64) -> Result<Vec<FitRecord>, RemoteError> {
        let url = format!("{}/activities/{}/records", self.base_url, id);
        let payload: Vec<Value> = self.get_json(&url).await?;
        payload
            .iter()
            .map(|entry| {
                entry.as_object().map(record_from_json).ok_or_else(|| {
                    RemoteError::InvalidResponse(format!("activity {id}: record is not an object"))
                })
            })
            .collect()
    }

    pub async fn profile(&self) -> Result<RemoteProfile, RemoteError> {
        let url = format!("{}/profile", self.base_url);
        self.get_json(&url).await
    }

    /// Fetches one activity's records and runs them through the pipeline.
    pub async fn fetch_activity(
        &self,
        activity: &RemoteActivity,
        normalizer: &Normalizer,
        local: FixedOffset,
    ) -> Result<ProcessedActivity, RemoteError> {
        tracing::info!(
            "Getting remote activity {} ({})",
            activity.name,
            activity.local_start(local)
        );
        let records = self.activity_records(activity.id).await?;
        let as_activity_error = |source: ActivityError| RemoteError::Activity {
            id: activity.id,
            source,
        };
        let parsed = parse_records(&records, activity.header(local), local)
            .map_err(|e| as_activity_error(e.into()))?;
        normalizer
            .process(parsed)
            .map_err(|e| as_activity_error(e.into()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|err| RemoteError::InvalidResponse(err.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncOptions {
    #[serde(default)]
    pub start: usize,
    /// Number of listed activities to consider; 0 walks the whole listing.
    #[serde(default)]
    pub max: usize,
    #[serde(default = "default_batch")]
    pub batch: usize,
    #[serde(skip)]
    pub range: DateRange,
    #[serde(default)]
    pub overwrite: bool,
    /// Record a profile snapshot before walking the listing.
    #[serde(default = "default_profile")]
    pub profile: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            start: 0,
            max: 0,
            batch: default_batch(),
            range: DateRange::default(),
            overwrite: false,
            profile: default_profile(),
        }
    }
}

fn default_batch() -> usize {
    10
}

fn default_profile() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub profile_updated: bool,
    pub listed: usize,
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

/// Fetches the athlete profile and appends a snapshot when it shows progress.
pub async fn update_profile(
    client: &RemoteClient,
    store: &ActivityStore,
    local: FixedOffset,
) -> Result<bool, RemoteError> {
    let profile = client.profile().await?;
    let now = Utc::now().with_timezone(&local).naive_local();
    let dtime = now.with_nanosecond(0).unwrap_or(now);
    Ok(store.record_profile(&profile.snapshot(dtime))?)
}

/// Pages through the remote listing and stores activities not yet imported.
pub async fn sync(
    client: &RemoteClient,
    store: &ActivityStore,
    normalizer: &Normalizer,
    local: FixedOffset,
    options: &SyncOptions,
) -> Result<SyncReport, RemoteError> {
    if options.overwrite && options.max == 0 {
        return Err(RemoteError::UnboundedOverwrite);
    }
    let batch = options.batch.max(1);
    let limit_reached = |listed: usize| options.max > 0 && listed >= options.max;

    let mut report = SyncReport::default();
    if options.profile {
        report.profile_updated = update_profile(client, store, local).await?;
    }
    let mut start = options.start;
    while !limit_reached(report.listed) {
        let page = client.list_activities(start, batch).await?;
        if page.is_empty() {
            break;
        }
        start += page.len();

        for activity in &page {
            if limit_reached(report.listed) {
                break;
            }
            report.listed += 1;

            let src_file = activity.src_file();
            let dtime = activity.local_start(local);
            tracing::info!("Found {}: {}", dtime, activity.name);
            if !options.range.contains(dtime) {
                continue;
            }
            if !options.overwrite && store.activity_exists_by_src_file(&src_file)? {
                report.skipped.push(src_file);
                continue;
            }

            let processed = match client.fetch_activity(activity, normalizer, local).await {
                Ok(processed) => processed,
                Err(err @ RemoteError::Activity { .. }) => {
                    tracing::warn!("{}", err);
                    report.failed.push(ImportFailure {
                        file: src_file,
                        error: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };
            match store.save_activity(&processed, options.overwrite)? {
                SaveOutcome::Kept => report.skipped.push(src_file),
                SaveOutcome::Inserted | SaveOutcome::Replaced => report.imported.push(src_file),
            }
        }
    }

    Ok(report)
}

fn round_1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
