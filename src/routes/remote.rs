use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, RemoteError};
use crate::remote::{sync, update_profile, RemoteClient, RemoteSummary, SyncOptions, SyncReport};
use crate::routes::parse_range;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/remote/activities", get(list_activities))
        .route("/api/remote/sync", post(sync_activities))
        .route("/api/remote/profile", post(refresh_profile))
}

#[derive(Deserialize)]
struct ListQuery {
    start: Option<usize>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct SyncRequest {
    #[serde(flatten)]
    options: SyncOptions,
    from: Option<String>,
    to: Option<String>,
}

fn client(state: &AppState) -> Result<&RemoteClient, AppError> {
    state
        .remote()
        .ok_or_else(|| AppError::Remote(RemoteError::NotConfigured))
}

async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RemoteSummary>>, AppError> {
    let client = client(&state)?;
    let local = state.local_offset();
    let activities = client
        .list_activities(query.start.unwrap_or(0), query.limit.unwrap_or(10).clamp(1, 100))
        .await?;

    Ok(Json(
        activities.iter().map(|a| a.summary(local)).collect(),
    ))
}

async fn sync_activities(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let client = client(&state)?;
    let mut options = req.options;
    options.range = parse_range(req.from.as_deref(), req.to.as_deref())?;

    let report = sync(
        client,
        state.store(),
        state.normalizer(),
        state.local_offset(),
        &options,
    )
    .await?;

    tracing::info!(
        "Remote sync finished: {} listed, {} imported, {} failed",
        report.listed,
        report.imported.len(),
        report.failed.len()
    );
    Ok(Json(report))
}

async fn refresh_profile(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let client = client(&state)?;
    let updated = update_profile(client, state.store(), state.local_offset()).await?;
    Ok(Json(json!({ "updated": updated })))
}
