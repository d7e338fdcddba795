//! denormd — query-dispatch front end for denormalized Q&A records.
//!
//! Binds a ZeroMQ ROUTER socket, fans multi-part query requests out to a
//! bounded worker pool, and routes JSON replies back to the requesting
//! client.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: tcp://0.0.0.0:7710, 5 workers, queue capacity 100
//! denormd
//!
//! # Custom pool and dataset
//! denormd --listen tcp://0.0.0.0:9000 --workers 8 --queue-capacity 50 \
//!     --dataset fixtures/dataset.json
//!
//! # From a config file
//! denormd --config denorm.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use denorm::config::DenormConfig;
use denorm::server::Server;
use denorm::store::MemoryStore;

/// Query-dispatch front end for denormalized Q&A records.
#[derive(Parser, Debug)]
#[command(name = "denormd", version, about)]
struct Cli {
    /// TOML config file. When given, the other flags are ignored and the
    /// file (plus DENORM_* env overrides) wins.
    #[arg(long, env = "DENORM_CONFIG")]
    config: Option<PathBuf>,

    /// Front door endpoint, e.g. "tcp://0.0.0.0:7710" or "ipc://denorm".
    #[arg(long, env = "DENORM_LISTEN", default_value = "tcp://0.0.0.0:7710")]
    listen: String,

    /// Number of workers.
    #[arg(long, env = "DENORM_WORKERS", default_value_t = 5)]
    workers: usize,

    /// Size of one worker's inbound queue.
    #[arg(long, env = "DENORM_QUEUE_CAPACITY", default_value_t = 100)]
    queue_capacity: usize,

    /// JSON dataset served by the in-memory store.
    #[arg(long, env = "DENORM_DATASET")]
    dataset: Option<PathBuf>,

    /// Interval in seconds between metrics log lines (0 = disabled).
    #[arg(long, env = "DENORM_METRICS_INTERVAL", default_value_t = 30)]
    metrics_interval: u64,

    /// Enable debug log messages.
    #[arg(long, env = "DENORM_DEBUG", default_value_t = false)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> Result<DenormConfig, denorm::DenormError> {
        if let Some(path) = &self.config {
            return DenormConfig::from_file(path);
        }
        let config = DenormConfig {
            listen: self.listen,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            dataset: self.dataset,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(?cli, "starting denormd");

    let metrics_interval = cli.metrics_interval;
    let config = cli.into_config()?;

    // Store startup is fatal on failure: a server that cannot reach its
    // data has nothing to serve.
    let store = Arc::new(match &config.dataset {
        Some(path) => {
            tracing::info!(dataset = %path.display(), "loading dataset");
            MemoryStore::from_file(path)?
        }
        None => {
            tracing::warn!("no dataset configured, serving an empty store");
            MemoryStore::empty()
        }
    });

    let server = Arc::new(Server::new(config));

    // Graceful shutdown on SIGINT/SIGTERM.
    let server_for_signal = Arc::clone(&server);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        server_for_signal.shutdown();
    });

    // Periodic metrics reporter.
    if metrics_interval > 0 {
        let metrics = server.metrics();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
            loop {
                interval.tick().await;
                tracing::info!(
                    frames = metrics.frames_received(),
                    replies = metrics.replies_sent(),
                    "server metrics"
                );
                for (task, count) in metrics.task_counts().await {
                    tracing::debug!(task = %task, count = count, "task stats");
                }
            }
        });
    }

    server.run(store).await?;

    tracing::info!("denormd exited cleanly");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl_c");
    }
}
