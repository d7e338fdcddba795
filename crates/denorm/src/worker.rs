//! The worker execution loop.
//!
//! Each worker pulls from its own bounded queue, runs one task at a time,
//! and pushes exactly one [`Product`] per item onto the shared reply queue.
//! Items are processed in the order they were enqueued to this worker —
//! FIFO per worker, not globally. Every per-request error is converted to a
//! failure Product here; nothing a request does can take the process down.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::frame::{Product, Work};
use crate::registry::{TaskError, TaskRegistry};
use crate::store::StoreSession;

pub struct QueryWorker {
    id: usize,
    registry: Arc<TaskRegistry>,
    session: Box<dyn StoreSession>,
    work_rx: mpsc::Receiver<Work>,
    product_tx: mpsc::Sender<Product>,
    stop_rx: watch::Receiver<bool>,
}

impl QueryWorker {
    /// The session is this worker's exclusive store connection, opened by
    /// the server at construction and released when the worker exits.
    pub fn new(
        id: usize,
        registry: Arc<TaskRegistry>,
        session: Box<dyn StoreSession>,
        work_rx: mpsc::Receiver<Work>,
        product_tx: mpsc::Sender<Product>,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            registry,
            session,
            work_rx,
            product_tx,
            stop_rx,
        }
    }

    /// Run until the work queue closes or stop is signalled. Items already
    /// queued at stop time are drained before exit; completion of the
    /// spawned task is the shutdown acknowledgment.
    pub async fn run(mut self) {
        debug!(worker = self.id, "ready");
        loop {
            tokio::select! {
                maybe_work = self.work_rx.recv() => {
                    match maybe_work {
                        Some(work) => self.handle(work).await,
                        // Dispatcher is gone and the queue is empty.
                        None => break,
                    }
                }
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        // Drain whatever the dispatcher already enqueued; shutdown is
        // graceful, not abrupt cancellation.
        while let Ok(work) = self.work_rx.try_recv() {
            self.handle(work).await;
        }
        debug!(worker = self.id, "stopped");
        // The store session drops here, releasing this worker's connection.
    }

    async fn handle(&mut self, work: Work) {
        let task = work.task.clone();
        let product = self.execute(work).await;
        if product.success {
            info!(worker = self.id, task = %task, "task completed");
        } else {
            warn!(
                worker = self.id,
                task = %task,
                error = %String::from_utf8_lossy(&product.payload),
                "task failed"
            );
        }
        if self.product_tx.send(product).await.is_err() {
            warn!(worker = self.id, "reply queue closed, product dropped");
        }
    }

    async fn execute(&mut self, work: Work) -> Product {
        let Work {
            routing,
            task,
            params,
        } = work;
        let outcome = match self.registry.lookup(&task) {
            Some(handler) => handler.execute(self.session.as_ref(), &params).await,
            None => Err(TaskError::UnknownTask(task)),
        };
        match outcome {
            Ok(Some(payload)) => Product::ok(routing, payload),
            Ok(None) => Product::not_found(routing),
            Err(e) => Product::failure(routing, e.to_string()),
        }
    }
}
