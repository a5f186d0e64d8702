//! Run the device monitor until interrupted

use anyhow::{Context, Result};
use camwatch_core::Config;
use cli_lib::ScriptHooks;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use watcher::{open_inotify, Monitor, ProcFs, ProcessScanner, RetryPolicy, WatchRegistrar};

pub async fn run(config: Config) -> Result<()> {
    if config.hooks.scripts.is_empty() {
        warn!("No scripts provided. Video device access will only be logged.");
    }

    let class = config.device_class();
    let policy = RetryPolicy {
        max_attempts: config.rearm.max_attempts,
        delay: config.retry_delay(),
    };
    let hooks = ScriptHooks::new(config.hooks.scripts.clone(), config.hooks.action_var.clone());

    let (backend, events) = open_inotify().context("Failed to set up device watching")?;
    let monitor = Monitor::new(
        WatchRegistrar::new(backend, class.clone(), policy),
        ProcessScanner::new(ProcFs::new(&config.scan.proc_root), class),
        Arc::new(hooks),
        config.debounce(),
    );

    monitor
        .run(events, shutdown_signal())
        .await
        .context("Failed to watch video devices")?;

    info!("Stopped.");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT.");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => info!("Received SIGINT."),
        _ = terminate => info!("Received SIGTERM."),
    }
}
