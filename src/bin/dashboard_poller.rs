//! Polls a running backend and logs what a dashboard would show.
//!
//! Usage:
//!   DASHBOARD_API_URL=http://127.0.0.1:8080 cargo run --bin dashboard_poller

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use village_telemetry::dashboard::DashboardPoller;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let base_url = std::env::var("DASHBOARD_API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080".to_owned());
    let interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
        .unwrap_or_else(|_| "2000".to_owned())
        .parse()
        .context("POLL_INTERVAL_MS must be a positive integer")?;
    anyhow::ensure!(interval_ms > 0, "POLL_INTERVAL_MS must be a positive integer");

    let mut poller = DashboardPoller::new(&base_url)?;
    poller
        .run_until(Duration::from_millis(interval_ms), async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C received"),
                Err(e) => {
                    // Keep polling; the process can still be stopped with SIGTERM.
                    error!(error = %e, "Failed to install Ctrl+C handler");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    Ok(())
}
