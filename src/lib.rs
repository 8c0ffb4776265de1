pub mod config;
pub mod error;
pub mod import;
pub mod pipeline;
pub mod remote;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

use axum::Router;

use crate::state::AppState;

/// All API routes, without middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::upload::router())
        .merge(routes::import::router())
        .merge(routes::activities::router())
        .merge(routes::power_curve::router())
        .merge(routes::profile::router())
        .merge(routes::remote::router())
        .with_state(state)
}
