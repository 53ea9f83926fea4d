mod config;
mod dialogue;
mod errors;
mod layout;
mod models;
mod render;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::dialogue::source::FixtureProfileSource;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the profile source used by dialogue analysis
    let source = match &config.profile_fixture_dir {
        Some(dir) => FixtureProfileSource::from_dir(dir)
            .with_context(|| format!("loading profile fixtures from {}", dir.display()))?,
        None => FixtureProfileSource::bundled().context("loading bundled profile fixtures")?,
    };
    info!(
        "Profile source ready (fixtures: {})",
        config
            .profile_fixture_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "bundled".to_string())
    );

    info!(
        "Analysis: {}ms delay, {} attempts; retaining up to {} artifacts and {} sessions",
        config.analysis_delay_ms,
        config.analysis_max_attempts,
        config.max_retained_artifacts,
        config.max_retained_sessions
    );

    // Build app state
    let state = AppState::new(&config, Arc::new(source));

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
