mod bootstrap;
mod health;
mod webhook;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use pullbot_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use pullbot_core::config::LogFormat::*;

    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        community_packs = app.config.features.community_packs,
        response_budget_ms = app.config.server.response_budget_ms,
        "pullbot-server listening for interactions"
    );

    let stopping = Arc::new(Notify::new());
    let signal = stopping.clone();
    let server = axum::serve(listener, app.router()).with_graceful_shutdown(async move {
        wait_for_shutdown().await;
        signal.notify_one();
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => joined??,
        _ = stopping.notified() => {
            let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "pullbot-server draining in-flight interactions"
            );
            match tokio::time::timeout(grace, server).await {
                Ok(joined) => joined??,
                Err(_) => tracing::warn!(
                    event_name = "system.server.stopping",
                    correlation_id = "shutdown",
                    "grace period elapsed with interactions still in flight"
                ),
            }
        }
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
