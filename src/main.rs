use ridelog_rs::{config, state};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ridelog_rs=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();
    let addr = format!("127.0.0.1:{}", config.port);
    let max_file_size = config.max_file_size;

    tracing::info!("Profile data directory: {}", config.data_dir.display());
    tracing::info!("Local time offset: UTC{:+}", config.utc_offset_hours);
    if config.remote_url.is_none() {
        tracing::info!("Remote activity source not configured");
    }

    let state = state::AppState::new(config);
    let app = ridelog_rs::app(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", addr, err);
            std::process::exit(1);
        }
    };

    tracing::info!("RideLog listening on {}", addr);
    tracing::info!("Upload: POST http://{}/api/upload", addr);
    tracing::info!("Power curve: GET http://{}/api/power-curve", addr);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
        std::process::exit(1);
    }
}
