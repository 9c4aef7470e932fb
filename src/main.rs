//! Wine Quality Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wine_quality_analyzer::api::{self, AppState};
use wine_quality_analyzer::config::ServiceConfig;
use wine_quality_analyzer::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - VINTAGE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("VINTAGE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wine_quality_analyzer=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = ServiceConfig::load();
    let metrics = Metrics::init(cfg.ui.reveal_delay_ms);

    // Artifacts load once here; a failure keeps the service up in the
    // offline state rather than crashing the deployment.
    let state = AppState::boot(&cfg);
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
