//! Wiring and lifecycle for the dispatch engine.
//!
//! `Server::run` binds the front door, opens one store session per worker,
//! starts the pool and the dispatcher, and blocks until [`Server::shutdown`]
//! is called. Shutdown is a drain, not a cancellation: the listener stops
//! accepting, channel closure cascades through dispatcher and workers, and
//! every reply still in flight is written before the socket closes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DenormConfig;
use crate::dispatch::{Dispatcher, WorkerQueue};
use crate::error::DenormError;
use crate::frame::Product;
use crate::listener::Listener;
use crate::metrics::ServerMetrics;
use crate::registry::TaskRegistry;
use crate::store::DataStore;
use crate::worker::QueryWorker;

/// How long the shutdown coordinator waits for each stage to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Server {
    config: DenormConfig,
    registry: Arc<TaskRegistry>,
    metrics: Arc<ServerMetrics>,
    stop_tx: watch::Sender<bool>,
}

impl Server {
    /// A server with the built-in query tasks.
    pub fn new(config: DenormConfig) -> Self {
        Self::with_registry(config, TaskRegistry::builtin())
    }

    pub fn with_registry(config: DenormConfig, registry: TaskRegistry) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            registry: Arc::new(registry),
            metrics: Arc::new(ServerMetrics::new()),
            stop_tx,
        }
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Request graceful shutdown: stop accepting, drain, close.
    pub fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Bind the front door, start the pool, and serve until shutdown.
    ///
    /// Startup errors — bind failure, store session failure — are returned
    /// and fatal; after startup every error is absorbed into a failure
    /// Product and the server keeps serving.
    pub async fn run(&self, store: Arc<dyn DataStore>) -> Result<(), DenormError> {
        let worker_count = self.config.workers;
        let capacity = self.config.queue_capacity;
        let transport = self.config.listen_transport()?;

        // Shared reply queue: many workers, one drain (the listener).
        let (product_tx, product_rx) = mpsc::channel::<Product>(worker_count * capacity);
        // Listener → dispatcher hand-off.
        let (work_tx, work_rx) = mpsc::channel(worker_count * capacity);
        // Stop token for the pool, sent only after the dispatcher has
        // finished, so draining workers never race an in-flight assign.
        let (worker_stop_tx, worker_stop_rx) = watch::channel(false);

        info!(
            tasks = ?self.registry.task_names(),
            workers = worker_count,
            queue_capacity = capacity,
            "starting worker pool"
        );

        let mut queues = Vec::with_capacity(worker_count);
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (tx, rx) = mpsc::channel(capacity);
            queues.push(WorkerQueue::new(id, tx));
            // One exclusive store session per worker; a failure here is a
            // startup failure and fatal.
            let session = store.open_session().await?;
            let worker = QueryWorker::new(
                id,
                Arc::clone(&self.registry),
                session,
                rx,
                product_tx.clone(),
                worker_stop_rx.clone(),
            );
            workers.push(tokio::spawn(worker.run()));
        }
        // The workers now hold the only product senders; once the last one
        // exits, the listener's flush loop can finish.
        drop(product_tx);
        drop(worker_stop_rx);

        let dispatcher = Dispatcher::new(queues);
        let dispatcher_handle = tokio::spawn(dispatcher.run(work_rx));

        let listener = Listener::bind(
            &transport,
            work_tx,
            product_rx,
            self.stop_tx.subscribe(),
            Arc::clone(&self.metrics),
        )
        .await?;
        let listener_handle = tokio::spawn(listener.run());
        info!(endpoint = %transport, "serving");

        // Block until shutdown is requested.
        let mut stop_rx = self.stop_tx.subscribe();
        while !*stop_rx.borrow() {
            if stop_rx.changed().await.is_err() {
                break;
            }
        }
        info!("shutdown requested, draining");

        // The listener has stopped accepting and dropped its work sender;
        // wait for the dispatcher to place what was already in flight.
        Self::join("dispatcher", dispatcher_handle).await;

        // Now the stop token: each worker drains its queue and exits.
        let _ = worker_stop_tx.send(true);
        for (id, handle) in workers.into_iter().enumerate() {
            match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!(worker = id, "worker drained"),
                Ok(Err(e)) => warn!(worker = id, error = %e, "worker task failed"),
                Err(_) => warn!(worker = id, "worker drain timed out"),
            }
        }

        // Last: the listener flushes remaining replies and the socket drops.
        match tokio::time::timeout(DRAIN_TIMEOUT, listener_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "listener task failed"),
            Err(_) => warn!("listener flush timed out"),
        }

        info!(
            frames = self.metrics.frames_received(),
            replies = self.metrics.replies_sent(),
            "server stopped"
        );
        Ok(())
    }

    async fn join(name: &str, handle: JoinHandle<()>) {
        match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
            Ok(Ok(())) => debug!(task = name, "drained"),
            Ok(Err(e)) => warn!(task = name, error = %e, "task failed"),
            Err(_) => warn!(task = name, "drain timed out"),
        }
    }
}
