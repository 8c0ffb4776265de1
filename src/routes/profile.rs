use axum::{extract::State, routing::get, Json, Router};

use crate::error::AppError;
use crate::state::AppState;
use crate::types::profile::ProfileSnapshot;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/profile", get(profile_history))
}

async fn profile_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileSnapshot>>, AppError> {
    Ok(Json(state.store().read_profile_history()?))
}
