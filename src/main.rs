// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Noticeboard API Server
//!
//! Serves the admin dashboard API and the public, read-only notice board.

use noticeboard::{
    config::Config, db::Database, models::Role, services::password, time_utils, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired and revoked sessions are purged.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Rate limiter buckets idle this long are dropped.
const LIMITER_IDLE: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Noticeboard API");

    let db = Database::connect(&config.database_url).await?;
    bootstrap_admin(&config, &db).await?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!(path = %config.upload_dir, "Upload directory ready");

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, db)?);
    spawn_housekeeping(state.clone());

    // Build router
    let app = noticeboard::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the first admin from `ADMIN_*` variables when no users exist.
async fn bootstrap_admin(
    config: &Config,
    db: &Database,
) -> Result<(), Box<dyn std::error::Error>> {
    if db.count_users().await? > 0 {
        return Ok(());
    }

    let (Some(username), Some(admin_password)) = (&config.admin_username, &config.admin_password)
    else {
        tracing::warn!(
            "No users exist; set ADMIN_USERNAME and ADMIN_PASSWORD to create the first admin"
        );
        return Ok(());
    };

    let to_hash = admin_password.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&to_hash)).await??;
    let user = db
        .create_user(username, config.admin_email.as_deref(), &hash, Role::Admin)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Created initial admin user");
    Ok(())
}

/// Periodic cleanup of sessions and rate limiter state.
fn spawn_housekeeping(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;

            match state.db.purge_sessions(time_utils::now()).await {
                Ok(purged) => tracing::info!(purged, "Purged expired sessions"),
                Err(e) => tracing::error!(error = %e, "Failed to purge sessions"),
            }

            let dropped = state.login_limiter.prune(LIMITER_IDLE)
                + state.public_limiter.prune(LIMITER_IDLE);
            tracing::debug!(dropped, "Pruned idle rate limiter buckets");
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,noticeboard=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
