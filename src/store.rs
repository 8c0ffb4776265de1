//! Flat-file activity store.
//!
//! ```text
//! <root>/activities.csv                        index, one row per activity
//! <root>/activities/2026-01-01_07-30-00.csv    cleaned samples
//! <root>/profile-updates.csv                   profile snapshots
//! ```
//!
//! Clones share one write lock, so concurrent saves never lose index rows.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;
use crate::types::activity::{ActivityMetadata, CleanedSample, DateRange, ProcessedActivity, Sport};
use crate::types::profile::ProfileSnapshot;

const INDEX_FILE: &str = "activities.csv";
const SAMPLES_DIR: &str = "activities";
const SAMPLE_FILE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const PROFILE_FILE: &str = "profile-updates.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Replaced,
    /// A row for the same source file exists and overwriting was not requested.
    Kept,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub range: DateRange,
    pub sport: Option<Sport>,
}

#[derive(Debug, Clone)]
pub struct ActivityStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ActivityStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// A panic while writing leaves the files as they were, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.root.join(SAMPLES_DIR)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.root.join(PROFILE_FILE)
    }

    pub fn sample_path(&self, dtime: NaiveDateTime) -> PathBuf {
        self.samples_dir()
            .join(format!("{}.csv", dtime.format(SAMPLE_FILE_FORMAT)))
    }

    pub fn save_activity(
        &self,
        activity: &ProcessedActivity,
        overwrite: bool,
    ) -> Result<SaveOutcome, StoreError> {
        let meta = &activity.metadata;
        let _guard = self.lock();
        let mut index = self.read_index()?;

        let existing = index.iter().position(|row| row.src_file == meta.src_file);
        let outcome = match existing {
            Some(_) if !overwrite => {
                tracing::info!("Row already exists for {}", meta.src_file);
                return Ok(SaveOutcome::Kept);
            }
            Some(pos) => {
                tracing::info!("Overwriting {} ({})", meta.src_file, meta.dtime);
                index.remove(pos);
                SaveOutcome::Replaced
            }
            None => SaveOutcome::Inserted,
        };

        let samples_dir = self.samples_dir();
        std::fs::create_dir_all(&samples_dir).map_err(|e| StoreError::io(&samples_dir, e))?;
        write_rows(&self.sample_path(meta.dtime), &activity.samples)?;

        index.push(meta.clone());
        index.sort_by_key(|row| row.dtime);
        replace_rows(&self.index_path(), &index)?;

        tracing::info!(
            "Stored {} ({}, {} samples)",
            meta.src_file,
            meta.dtime,
            activity.samples.len()
        );
        Ok(outcome)
    }

    /// All index rows, sorted by start time. A missing index is an empty store.
    pub fn read_index(&self) -> Result<Vec<ActivityMetadata>, StoreError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rows: Vec<ActivityMetadata> = read_rows(&path)?;
        rows.sort_by_key(|row| row.dtime);
        Ok(rows)
    }

    /// Case-insensitive match on the source file name (not a path).
    pub fn activity_exists_by_src_file(&self, src_file: &str) -> Result<bool, StoreError> {
        let wanted = src_file.to_lowercase();
        Ok(self
            .read_index()?
            .iter()
            .any(|row| row.src_file.to_lowercase() == wanted))
    }

    /// Whether `dtime` falls inside a stored activity, padded by `tolerance_secs` on both ends.
    pub fn activity_exists_at(
        &self,
        dtime: NaiveDateTime,
        tolerance_secs: i64,
    ) -> Result<bool, StoreError> {
        let tolerance = chrono::Duration::seconds(tolerance_secs);
        Ok(self.read_index()?.iter().any(|row| {
            row.dtime - tolerance <= dtime && row.end_time() + tolerance >= dtime
        }))
    }

    pub fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<ActivityMetadata>, StoreError> {
        Ok(self
            .read_index()?
            .into_iter()
            .filter(|row| filter.sport.map_or(true, |sport| row.sport == sport))
            .filter(|row| filter.range.contains(row.dtime))
            .collect())
    }

    /// Cleaned samples of the activity starting at `dtime`, if stored.
    pub fn load_samples(&self, dtime: NaiveDateTime) -> Result<Option<Vec<CleanedSample>>, StoreError> {
        let path = self.sample_path(dtime);
        if !path.exists() {
            return Ok(None);
        }
        self.read_samples(&path).map(Some)
    }

    pub fn read_samples(&self, path: &Path) -> Result<Vec<CleanedSample>, StoreError> {
        read_rows(path)
    }

    /// Profile snapshots, oldest first. A missing file is an empty history.
    pub fn read_profile_history(&self) -> Result<Vec<ProfileSnapshot>, StoreError> {
        let path = self.profile_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rows: Vec<ProfileSnapshot> = read_rows(&path)?;
        rows.sort_by_key(|row| row.dtime);
        Ok(rows)
    }

    pub fn latest_profile(&self) -> Result<Option<ProfileSnapshot>, StoreError> {
        Ok(self.read_profile_history()?.pop())
    }

    /// Appends `snapshot` unless it shows no progress over the latest stored one.
    /// Returns whether a row was written.
    pub fn record_profile(&self, snapshot: &ProfileSnapshot) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut history = self.read_profile_history()?;
        if history.last().is_some_and(|latest| !snapshot.changed_from(latest)) {
            tracing::info!("Profile up to date");
            return Ok(false);
        }

        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        history.push(snapshot.clone());
        history.sort_by_key(|row| row.dtime);
        replace_rows(&self.profile_path(), &history)?;
        tracing::info!("Profile updated at {}", snapshot.dtime);
        Ok(true)
    }

    /// Sample files whose name-encoded start time lies in `range`, oldest first.
    pub fn sample_files(&self, range: DateRange) -> Result<Vec<(NaiveDateTime, PathBuf)>, StoreError> {
        let dir = self.samples_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(dtime) = NaiveDateTime::parse_from_str(stem, SAMPLE_FILE_FORMAT) else {
                continue;
            };
            if range.contains(dtime) {
                files.push((dtime, path));
            }
        }
        files.sort();
        Ok(files)
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Writes next to `path` and renames over it, so readers never see a half-written file.
fn replace_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let tmp = path.with_extension("csv.tmp");
    write_rows(&tmp, rows)?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        let row = row.map_err(|e| {
            StoreError::InvalidRow(format!("{} row {}: {}", path.display(), line + 1, e))
        })?;
        rows.push(row);
    }
    Ok(rows)
}
