use axum::extract::Multipart;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::error::AppError;
use crate::pipeline::parse;
use crate::state::AppState;
use crate::store::SaveOutcome;
use crate::types::activity::{ActivityMetadata, FileFormat, ProcessedActivity};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload))
}

#[derive(Serialize)]
struct UploadResponse {
    file_type: String,
    stored: bool,
    samples: usize,
    metadata: ActivityMetadata,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut sport: Option<String> = None;
    let mut overwrite = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                file_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e)))?
                        .to_vec(),
                );
            }
            "sport" | "overwrite" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                let value = value.trim().to_lowercase();
                if name == "sport" {
                    sport = Some(value).filter(|v| !v.is_empty());
                } else {
                    overwrite = matches!(value.as_str(), "1" | "true" | "yes");
                }
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let filename = filename.ok_or_else(|| AppError::BadRequest("No filename provided".to_string()))?;

    let format = FileFormat::from_filename(&filename)
        .ok_or_else(|| AppError::BadRequest("Unsupported file format".to_string()))?;

    tracing::info!("Parsing {} file: {}", format.as_str(), filename);

    let worker = state.clone();
    let name = filename.clone();
    let (processed, outcome) = tokio::task::spawn_blocking(
        move || -> Result<(ProcessedActivity, SaveOutcome), AppError> {
            let mut parsed = parse::parse(&bytes, format, &name, worker.local_offset())?;
            if parsed.header.sport.as_deref().map_or(true, str::is_empty) {
                parsed.header.sport = sport;
            }
            let processed = worker.normalizer().process(parsed)?;
            let outcome = worker.store().save_activity(&processed, overwrite)?;
            Ok((processed, outcome))
        },
    )
    .await
    .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))??;

    tracing::info!(
        "Uploaded file {} ({} samples, {:?} km, {:?})",
        filename,
        processed.samples.len(),
        processed.metadata.distance,
        outcome
    );

    Ok(Json(UploadResponse {
        file_type: format.as_str().to_string(),
        stored: outcome != SaveOutcome::Kept,
        samples: processed.samples.len(),
        metadata: processed.metadata,
    }))
}
