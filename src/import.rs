use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{ActivityError, AppError, StoreError};
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::parse;
use crate::store::{ActivityStore, SaveOutcome};
use crate::types::activity::{DateRange, FileFormat, ProcessedActivity};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Stop after this many activities were stored.
    pub max: Option<usize>,
    pub range: DateRange,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub found: usize,
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

/// Parses and normalizes one activity file.
pub fn load_activity(
    path: &Path,
    normalizer: &Normalizer,
    local: FixedOffset,
    sport: Option<&str>,
) -> Result<ProcessedActivity, ActivityError> {
    let mut parsed = parse::parse_file(path, local)?;
    if parsed.header.sport.as_deref().map_or(true, str::is_empty) {
        parsed.header.sport = sport.map(str::to_lowercase);
    }
    Ok(normalizer.process(parsed)?)
}

pub fn import_file(
    store: &ActivityStore,
    normalizer: &Normalizer,
    local: FixedOffset,
    path: &Path,
    sport: Option<&str>,
    overwrite: bool,
) -> Result<SaveOutcome, AppError> {
    let activity = load_activity(path, normalizer, local, sport)?;
    Ok(store.save_activity(&activity, overwrite)?)
}

/// Imports every TCX/GPX/FIT file in `dir`.
///
/// Files are parsed in parallel; stores happen one at a time in file-name
/// order. A file that fails to parse is reported and skipped.
pub fn import_dir(
    store: &ActivityStore,
    normalizer: &Normalizer,
    local: FixedOffset,
    dir: &Path,
    options: &ImportOptions,
) -> Result<ImportReport, StoreError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| StoreError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut report = ImportReport {
        found: files.len(),
        ..ImportReport::default()
    };
    tracing::info!("Found {} files in {}", files.len(), dir.display());

    let mut candidates = Vec::new();
    for path in files {
        let filename = file_name(&path);
        if FileFormat::from_filename(&filename).is_none() {
            continue;
        }
        if !options.overwrite && store.activity_exists_by_src_file(&filename)? {
            tracing::info!("Skipping {} (already processed)", filename);
            report.skipped.push(filename);
            continue;
        }
        candidates.push(path);
    }

    let loaded: Vec<(PathBuf, Result<ProcessedActivity, ActivityError>)> = candidates
        .into_par_iter()
        .map(|path| {
            let result = load_activity(&path, normalizer, local, None);
            (path, result)
        })
        .collect();

    for (path, result) in loaded {
        let filename = file_name(&path);
        let activity = match result {
            Ok(activity) => activity,
            Err(err) => {
                tracing::warn!("Failed to import {}: {}", filename, err);
                report.failed.push(ImportFailure {
                    file: filename,
                    error: err.to_string(),
                });
                continue;
            }
        };
        if !options.range.contains(activity.metadata.dtime) {
            continue;
        }

        tracing::info!("Importing {}", filename);
        match store.save_activity(&activity, options.overwrite)? {
            SaveOutcome::Kept => report.skipped.push(filename),
            SaveOutcome::Inserted | SaveOutcome::Replaced => report.imported.push(filename),
        }
        if options.max.map_or(false, |max| report.imported.len() >= max) {
            break;
        }
    }

    Ok(report)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
