// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `teaved` — the Teave event manager daemon.

use teave_daemon::lifecycle::{self, Config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("teaved failed: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), lifecycle::LifecycleError> {
    let config = Config::load()?;
    info!(state_dir = %config.state_dir.display(), "starting teaved");

    let state = lifecycle::startup(&config).await?;
    let shutdown = state.shutdown.clone();

    let listener = tokio::spawn(state.listener.run());
    let runtime = tokio::spawn(state.runtime.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    let _ = runtime.await;
    let _ = listener.await;
    lifecycle::cleanup(&config);
    info!("teaved stopped");
    Ok(())
}
