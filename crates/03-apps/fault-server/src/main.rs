//! Fault injection server for Modbus device simulators.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fault_harness::Harness;
use fault_server::{build_app, AppState, Args};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Args::parse().into_config()?;
    let state = AppState::new(Harness::new(config.harness));
    let app = build_app(state);

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.addr))?;

    info!(
        "fault harness listening on http://{} (history capacity {})",
        config.addr, config.harness.history_capacity
    );

    let server = axum::serve(listener, app.into_make_service());

    tokio::select! {
        result = server => result.context("server exited with error")?,
        _ = signal::ctrl_c() => {
            warn!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).try_init();
}
