//! Message dispatch service.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller / admin API
//!          │ enqueue
//!          ▼
//!   ┌──────────────┐   clearance   ┌──────────────┐
//!   │ dispatch     │──────────────▶│ rate_limit   │
//!   │ queue+workers│               └──────────────┘
//!   │              │   send        ┌──────────────┐
//!   │              │──────────────▶│ provider     │──▶ messaging API
//!   │              │               └──────────────┘
//!   │              │   non-2xx     ┌──────────────┐
//!   │              │──────────────▶│ resilience   │──▶ alert sink
//!   │              │               └──────────────┘
//!   │              │   CallMetric  ┌──────────────┐
//!   │              │──────────────▶│ telemetry    │
//!   └──────────────┘               └──────────────┘
//!
//!   subscription manager ──▶ provider (subscribed_apps) ──▶ resilience
//!   config watcher ──▶ retry table / tenant limits / credentials (live)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use message_dispatch::admin::{setup_admin_router, AdminState};
use message_dispatch::config::loader::load_config;
use message_dispatch::config::watcher::ConfigWatcher;
use message_dispatch::lifecycle::{shutdown_signal, Shutdown};
use message_dispatch::observability::{logging, metrics};
use message_dispatch::DispatchService;

#[derive(Parser)]
#[command(name = "message-dispatch")]
#[command(about = "Outbound message dispatch service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "message-dispatch starting");
    tracing::info!(
        config = %args.config.display(),
        provider = %config.provider.base_url,
        api_version = %config.provider.api_version,
        concurrency = config.workers.concurrency,
        tenants = config.tenants.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Arc::new(DispatchService::from_config(&config)?);
    service.start()?;

    let shutdown = Arc::new(Shutdown::new());
    let admin_state = AdminState::new(service.clone(), &config.admin.api_key);

    // Config hot reload
    let (watcher, mut updates) = ConfigWatcher::new(&args.config);
    let _watcher = match watcher.run() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };
    {
        let service = service.clone();
        let admin_state = admin_state.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(next) => match service.apply_config(&next) {
                            Ok(()) => admin_state.set_api_key(&next.admin.api_key),
                            Err(e) => tracing::error!(error = %e, "Rejected config reload"),
                        },
                        None => break,
                    },
                    _ = shutdown.wait() => break,
                }
            }
        });
    }

    // Admin API
    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(admin_state);
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.wait().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        }))
    } else {
        None
    };

    shutdown_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();

    if let Some(task) = admin_task {
        let _ = task.await;
    }
    service.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
