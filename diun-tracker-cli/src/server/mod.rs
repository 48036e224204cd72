pub mod config;
mod error;
mod metrics;
mod routes;
mod state;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use diun_tracker_lib::SystemClock;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use self::config::TrackerConfig;
use self::metrics::{handle_metrics, track_metrics};
use self::routes::{
    handle_home, handle_updates, handle_updates_list, handle_updates_summary, handle_webhook,
};
use self::state::AppState;
use self::store::open_store;

/// Command-line values that take precedence over the config file and env.
#[derive(Debug, Default)]
pub struct ServeArgs {
    pub config_path: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub storage_file: Option<PathBuf>,
}

/// Resolve the effective configuration: CLI args override environment
/// variables, which override the config file, which overrides defaults.
pub fn resolve_config(args: &ServeArgs) -> TrackerConfig {
    resolve_config_with(args, |key| std::env::var(key).ok())
}

fn resolve_config_with(
    args: &ServeArgs,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> TrackerConfig {
    let mut config = TrackerConfig::load(&args.config_path);
    config.apply_overrides(env_lookup);
    if let Some(ref hostname) = args.hostname {
        config.server.hostname = hostname.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref path) = args.storage_file {
        config.storage.path = path.clone();
    }
    config
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_home))
        .route("/webhook", post(handle_webhook))
        .route("/updates", get(handle_updates))
        .route("/updates/list", get(handle_updates_list))
        .route("/updates/summary", get(handle_updates_summary))
        .route("/metrics", get(handle_metrics))
        .layer(axum::middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

pub async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args);

    let store = open_store(&config.storage);
    store
        .init()
        .await
        .with_context(|| format!("failed to initialize store at {}", store.describe()))?;

    let state = Arc::new(AppState::new(store, Arc::new(SystemClock)));
    let app = build_router(Arc::clone(&state));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    info!(
        "tracking updates in {} on http://{}",
        state.store.describe(),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, finishing in-flight requests...");
}
