//! Path-prefix HTTP dispatcher.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 DISPATCHER                   │
//!                         │                                              │
//!     Client Request      │  ┌──────────┐   ┌─────────────┐              │
//!     ────────────────────┼─▶│   net    │──▶│   routing   │              │
//!                         │  │ listener │   │ Application │              │
//!                         │  └──────────┘   └──────┬──────┘              │
//!                         │                        │ first prefix match  │
//!                         │          ┌─────────────┼─────────────┐       │
//!                         │          ▼             ▼             ▼       │
//!                         │     ┌────────┐    ┌─────────┐   ┌────────┐   │
//!                         │     │  mock  │    │  proxy  │   │ static │   │
//!                         │     │  file  │    │ upstream│   │  dir   │   │
//!                         │     └────────┘    └────┬────┘   └────────┘   │
//!                         │                        │                     │
//!                         │  config ── WebServer ──┘── lifecycle         │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use path_dispatcher::config::{load_config, watcher::ConfigWatcher, Configuration};
use path_dispatcher::lifecycle::{LifecycleEvent, Signals};
use path_dispatcher::observability::{logging, metrics};
use path_dispatcher::WebServer;

#[derive(Parser)]
#[command(name = "path-dispatcher")]
#[command(about = "Serve mock, proxy and static routes on one port", long_about = None)]
struct Cli {
    /// Configuration file (TOML, or JSON when the extension is `.json`)
    #[arg(short, long, default_value = "dispatcher.toml")]
    config: PathBuf,

    /// Reload routes when the configuration file changes
    #[arg(short, long)]
    watch: bool,

    /// Override `listenPort`
    #[arg(short, long)]
    port: Option<u16>,
}

impl Cli {
    fn load(&self) -> Result<Configuration, Box<dyn std::error::Error>> {
        let mut config = load_config(&self.config)?;
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(config = ?cli.config, "path-dispatcher v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut signals = Signals::install()?;

    let mut server = WebServer::new();
    server.process_config(&config).await?;
    let mut drain_timeout = Duration::from_secs(config.drain_timeout_secs);

    let (mut updates, _watcher) = if cli.watch {
        let (watcher, updates) = ConfigWatcher::new(&cli.config);
        (Some(updates), Some(watcher.run()?))
    } else {
        (None, None)
    };

    loop {
        let next = tokio::select! {
            event = signals.recv() => match event {
                LifecycleEvent::Shutdown => break,
                LifecycleEvent::Reload => match cli.load() {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to reload config, keeping current routes");
                        continue;
                    }
                },
            },
            Some(mut config) = recv_update(&mut updates) => {
                if let Some(port) = cli.port {
                    config.listen_port = port;
                }
                config
            }
        };

        match server.reload(&next).await {
            Ok(()) => drain_timeout = Duration::from_secs(next.drain_timeout_secs),
            Err(e) if !server.port_state().is_bound() => {
                tracing::error!(error = %e, code = e.code(), "Reload left no listening socket, exiting");
                return Err(e.into());
            }
            Err(e) => tracing::error!(error = %e, code = e.code(), "Reload failed"),
        }
    }

    tracing::info!(timeout_secs = drain_timeout.as_secs(), "Shutting down");
    server.shutdown(drain_timeout).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn recv_update(
    updates: &mut Option<tokio::sync::mpsc::UnboundedReceiver<Configuration>>,
) -> Option<Configuration> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
