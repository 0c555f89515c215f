//! Umami Digest - a daily website-analytics summary delivered by email.
//!
//! # API Endpoints
//!
//! - `GET /api/email` - Build the last 24 hours' report and email it
//! - `GET /api/cron/analytics` - Build the report without sending it
//! - `GET /health` - Health check
//!
//! Scheduling is external: a scheduler calls `/api/email` on `CRON_SCHEDULE`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use umami_digest::api::{AppState, router};
use umami_digest::config::Config;
use umami_digest::notifier::ResendNotifier;
use umami_digest::report::ReportBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("umami_digest=info".parse()?))
        .init();

    // Load configuration from environment; refuse to start without it
    let config = Config::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    info!(
        port = config.port,
        umami = %config.umami_api_url,
        website_id = %config.website_id,
        recipient = %config.recipient_email,
        cron_schedule = %config.cron_schedule,
        "Starting Umami Digest"
    );

    let builder = ReportBuilder::new(&config)?;
    let notifier = ResendNotifier::new(&config)?;

    // Create application state
    let state = AppState {
        builder,
        notifier: Arc::new(notifier),
        development: config.development,
    };

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Umami Digest is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
