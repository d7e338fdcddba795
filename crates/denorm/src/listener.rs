//! The front door: a single-owner actor for the ROUTER socket.
//!
//! Receive and reply both touch the one socket, so one task owns it and
//! interleaves the two paths with `select!` instead of locking around
//! arbitrary socket calls. The receive side polls with a bounded timeout,
//! and the hand-off to the dispatcher keeps draining replies while it
//! waits, so pending replies are never starved — not behind a quiet
//! socket, and not behind a saturated pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use zeromq::prelude::*;
use zeromq::{RouterSocket, ZmqMessage};

use crate::error::DenormError;
use crate::frame::{self, Inbound, Product, Work};
use crate::metrics::ServerMetrics;
use crate::transport::Transport;

/// Bounded poll so the loop re-checks the reply queue and the stop flag
/// even when no requests arrive.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Listener {
    socket: RouterSocket,
    work_tx: mpsc::Sender<Work>,
    product_rx: mpsc::Receiver<Product>,
    stop_rx: watch::Receiver<bool>,
    metrics: Arc<ServerMetrics>,
}

/// What the select loop decided to do next.
enum Step {
    Reply(Product),
    Frame(ZmqMessage),
    Idle,
    Stop,
    Closed,
}

/// Outcome of one wait while a parsed work item is pending hand-off.
enum HandOff {
    Sent,
    Reply(Product),
    Closed,
}

impl Listener {
    /// Bind the ROUTER socket. A bind failure is fatal — the process does
    /// not serve.
    pub async fn bind(
        transport: &Transport,
        work_tx: mpsc::Sender<Work>,
        product_rx: mpsc::Receiver<Product>,
        stop_rx: watch::Receiver<bool>,
        metrics: Arc<ServerMetrics>,
    ) -> Result<Self, DenormError> {
        transport
            .ensure_ipc_dir()
            .map_err(|e| DenormError::Transport(e.to_string()))?;
        transport
            .remove_stale_socket()
            .map_err(|e| DenormError::Transport(e.to_string()))?;

        let mut socket = RouterSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding frontend ROUTER socket");
        socket.bind(&endpoint).await?;

        Ok(Self {
            socket,
            work_tx,
            product_rx,
            stop_rx,
            metrics,
        })
    }

    /// Serve until stop is signalled or the pipeline goes away, then flush
    /// remaining replies before the socket drops.
    pub async fn run(mut self) {
        info!("front door ready");
        loop {
            let step = tokio::select! {
                maybe_product = self.product_rx.recv() => match maybe_product {
                    Some(product) => Step::Reply(product),
                    None => Step::Closed,
                },
                recv = tokio::time::timeout(POLL_TIMEOUT, self.socket.recv()) => match recv {
                    Ok(Ok(msg)) => Step::Frame(msg),
                    Ok(Err(e)) => {
                        warn!(error = %e, "frontend recv error");
                        Step::Idle
                    }
                    Err(_) => Step::Idle,
                },
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        Step::Stop
                    } else {
                        Step::Idle
                    }
                }
            };

            match step {
                Step::Reply(product) => self.send_reply(product).await,
                Step::Frame(msg) => {
                    if !self.accept(msg).await {
                        break;
                    }
                }
                Step::Idle => {}
                Step::Stop => {
                    debug!("front door stopping");
                    break;
                }
                Step::Closed => {
                    debug!("reply queue closed");
                    return;
                }
            }
        }

        // Stop accepting: dropping the work sender lets the dispatcher
        // finish, which closes the worker queues in turn. Whatever the
        // draining workers still produce is flushed before the socket
        // drops.
        let Self {
            mut socket,
            work_tx,
            mut product_rx,
            metrics,
            ..
        } = self;
        drop(work_tx);
        while let Some(product) = product_rx.recv().await {
            Self::write_reply(&mut socket, &metrics, product).await;
        }
        info!("front door closed");
    }

    /// Parse one inbound frame. Returns `false` when the worker pool has
    /// gone away.
    async fn accept(&mut self, msg: ZmqMessage) -> bool {
        self.metrics.record_frame();
        match frame::parse_request(&msg) {
            Inbound::Work(work) => {
                debug!(task = %work.task, params = work.params.len(), "request received");
                self.metrics.record_task(&work.task).await;
                self.hand_off(work).await
            }
            Inbound::NoTask(routing) => {
                debug!("frame without a task");
                self.send_reply(Product::failure(routing, "no task specified"))
                    .await;
                true
            }
            Inbound::Ignore => {
                debug!("unroutable frame ignored");
                true
            }
        }
    }

    /// Hand one work item to the dispatcher.
    ///
    /// Waits for a queue slot when the pool is saturated, so backpressure
    /// slows frame ingestion here rather than buffering without bound.
    /// Replies keep draining during the wait: a worker blocked on the
    /// reply queue must not hold up the drain that would unblock it.
    /// Returns `false` when the pipeline has gone away.
    async fn hand_off(&mut self, work: Work) -> bool {
        let mut pending = Some(work);
        while pending.is_some() {
            let step = tokio::select! {
                permit = self.work_tx.reserve() => match permit {
                    Ok(permit) => {
                        if let Some(work) = pending.take() {
                            permit.send(work);
                        }
                        HandOff::Sent
                    }
                    Err(_) => HandOff::Closed,
                },
                maybe_product = self.product_rx.recv() => match maybe_product {
                    Some(product) => HandOff::Reply(product),
                    None => HandOff::Closed,
                },
            };
            match step {
                HandOff::Sent => {}
                HandOff::Reply(product) => self.send_reply(product).await,
                HandOff::Closed => {
                    warn!("pipeline closed, request dropped");
                    return false;
                }
            }
        }
        true
    }

    async fn send_reply(&mut self, product: Product) {
        Self::write_reply(&mut self.socket, &self.metrics, product).await;
    }

    async fn write_reply(
        socket: &mut RouterSocket,
        metrics: &ServerMetrics,
        product: Product,
    ) {
        debug!(
            success = product.success,
            empty = product.empty,
            "sending reply"
        );
        match frame::encode_reply(product) {
            Ok(msg) => {
                if let Err(e) = socket.send(msg).await {
                    warn!(error = %e, "unable to send reply");
                } else {
                    metrics.record_reply();
                }
            }
            Err(e) => warn!(error = %e, "unable to encode reply"),
        }
    }
}
