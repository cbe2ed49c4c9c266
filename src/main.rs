use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use village_telemetry::{
    api::{self, AppState},
    board::BoardClient,
    config::Config,
    store::DeviceStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Env vars may be set externally; a missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let store = DeviceStore::connect(&config.store).await?;

    if config.esp8266_base_url.is_none() {
        warn!("ESP8266_BASE_URL not set; board proxy will answer 500");
    }
    let board = BoardClient::new(config.esp8266_base_url.clone());

    let demo = config.demo_data.then_some(config.stale_after_ms);
    info!(demo_data = config.demo_data, stale_after_ms = config.stale_after_ms, "Sensor service configured");

    let state = AppState::new(store, board, demo);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
