use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::parse_range;
use crate::state::AppState;
use crate::types::power::PowerCurveReport;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/power-curve", get(power_curve))
}

#[derive(Deserialize)]
struct PowerCurveQuery {
    from: Option<String>,
    to: Option<String>,
    max_hr: Option<f64>,
}

async fn power_curve(
    State(state): State<AppState>,
    Query(query): Query<PowerCurveQuery>,
) -> Result<Json<PowerCurveReport>, AppError> {
    let range = parse_range(query.from.as_deref(), query.to.as_deref())?;
    let report = state
        .power_curve()
        .query(state.store(), range, query.max_hr)?;

    tracing::info!(
        "Power curve over {} activities ({} durations)",
        report.activities.len(),
        report.best.watts.len()
    );
    Ok(Json(report))
}
