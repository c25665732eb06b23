//! Statuswatch — Binary Entrypoint
//! Boots the Axum HTTP server and the background feed poller, wiring
//! routes, shared state, and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use statuswatch::config::PollerConfig;
use statuswatch::ingest::providers::status_rss::StatusRssProvider;
use statuswatch::ingest::scheduler::{spawn_poller, PollerCfg};
use statuswatch::ingest::Pipeline;
use statuswatch::metrics::Metrics;
use statuswatch::{api, ingest::types::FeedSource};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - STATUSWATCH_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("STATUSWATCH_DEV_LOG")
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
        .unwrap_or_else(|_| EnvFilter::new("statuswatch=info,poller=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = PollerConfig::from_env();
    let metrics = Metrics::init();

    let pipeline = Pipeline::new(&config);
    let source: Arc<dyn FeedSource> = Arc::new(StatusRssProvider::from_url(config.feed_url.clone()));
    spawn_poller(
        PollerCfg {
            interval_secs: config.interval_secs,
        },
        source,
        pipeline.clone(),
    );

    let router = api::router(pipeline).merge(metrics.router());
    Ok(router.into())
}
