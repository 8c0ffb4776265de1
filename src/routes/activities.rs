use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::parse_range;
use crate::state::AppState;
use crate::store::ActivityFilter;
use crate::types::activity::{ActivityMetadata, CleanedSample, Sport};
use crate::types::serde_fmt::parse_dtime;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/activities", get(list_activities))
        .route("/api/activities/:dtime/samples", get(activity_samples))
}

#[derive(Deserialize)]
struct ListQuery {
    from: Option<String>,
    to: Option<String>,
    sport: Option<String>,
}

async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ActivityMetadata>>, AppError> {
    let range = parse_range(query.from.as_deref(), query.to.as_deref())?;
    let sport = match query.sport.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<Sport>().map_err(|_| {
            AppError::BadRequest(format!(
                "Invalid sport: {}. Use 'cycling', 'running', or 'other'",
                raw
            ))
        })?),
        None => None,
    };

    let rows = state.store().list_activities(&ActivityFilter { range, sport })?;
    Ok(Json(rows))
}

async fn activity_samples(
    State(state): State<AppState>,
    Path(dtime): Path<String>,
) -> Result<Json<Vec<CleanedSample>>, AppError> {
    let start = NaiveDateTime::parse_from_str(&dtime, "%Y-%m-%d_%H-%M-%S")
        .ok()
        .or_else(|| parse_dtime(&dtime))
        .ok_or_else(|| AppError::BadRequest(format!("Invalid activity time: {}", dtime)))?;

    let samples = state
        .store()
        .load_samples(start)?
        .ok_or_else(|| AppError::NotFound(dtime.clone()))?;
    Ok(Json(samples))
}
