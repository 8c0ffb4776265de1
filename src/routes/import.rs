use std::path::PathBuf;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::import::{import_dir, ImportOptions, ImportReport};
use crate::routes::parse_range;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/import", post(import))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportRequest {
    dir: PathBuf,
    max: Option<usize>,
    from: Option<String>,
    to: Option<String>,
    #[serde(default)]
    overwrite: bool,
}

async fn import(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportReport>, AppError> {
    if !req.dir.is_dir() {
        return Err(AppError::BadRequest(format!(
            "Not a directory: {}",
            req.dir.display()
        )));
    }

    let options = ImportOptions {
        max: req.max.filter(|m| *m > 0),
        range: parse_range(req.from.as_deref(), req.to.as_deref())?,
        overwrite: req.overwrite,
    };

    let dir = req.dir.clone();
    let worker = state.clone();
    let report = tokio::task::spawn_blocking(move || {
        import_dir(
            worker.store(),
            worker.normalizer(),
            worker.local_offset(),
            &dir,
            &options,
        )
    })
    .await
    .map_err(|e| AppError::Internal(format!("Import task failed: {}", e)))??;

    tracing::info!(
        "Import of {} finished: {} imported, {} skipped, {} failed",
        req.dir.display(),
        report.imported.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(Json(report))
}
